//! Shared fakes for exercising the pipeline without a player process or
//! network access

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::backend::PlayerBackend;
use super::resolver::StreamResolver;
use super::AudioError;

/// Resolver mapping each reference to `resolved:<reference>`, or failing
/// every call
pub struct FakeResolver {
    fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn ok() -> Self {
        Self {
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl StreamResolver for FakeResolver {
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AudioError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AudioError::Resolution {
                    reference: reference.to_string(),
                    message: "lookup failed".to_string(),
                })
            } else {
                Ok(format!("resolved:{}", reference))
            }
        })
    }
}

/// Backend recording the active URL and how many sessions were started
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub active: Arc<Mutex<Option<String>>>,
    pub starts: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn active_url(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }
}

impl PlayerBackend for FakeBackend {
    fn start(&mut self, url: &str) -> Result<(), AudioError> {
        *self.active.lock().unwrap() = Some(url.to_string());
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        *self.active.lock().unwrap() = None;
        Ok(())
    }

    fn is_active(&mut self) -> bool {
        self.active.lock().unwrap().is_some()
    }
}
