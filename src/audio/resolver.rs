//! Stream reference resolution
//!
//! Turns an audio reference (a track URL from the preset table) into the URL
//! the player is handed. Resolution is network-bound and carries a bounded
//! timeout so a dead endpoint cannot stall a play command indefinitely.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use super::AudioError;

/// Resolves a stream reference to a playable URL
pub trait StreamResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AudioError>> + Send + 'a>>;
}

/// Production resolver: probes the reference over HTTP and returns the final
/// post-redirect URL
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new(timeout: Duration) -> Result<Self, AudioError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AudioError::Init(e.to_string()))?;
        Ok(Self { client })
    }
}

impl StreamResolver for HttpResolver {
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AudioError>> + Send + 'a>> {
        Box::pin(async move {
            debug!(reference, "resolving stream");

            let response = self.client.get(reference).send().await.map_err(|e| {
                AudioError::Resolution {
                    reference: reference.to_string(),
                    message: e.to_string(),
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(AudioError::Resolution {
                    reference: reference.to_string(),
                    message: format!("endpoint returned {}", status),
                });
            }

            let stream_url = response.url().to_string();
            debug!(reference, %stream_url, "stream resolved");
            Ok(stream_url)
        })
    }
}
