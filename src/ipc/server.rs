//! Unix domain socket server for IPC
//!
//! Request-response command surface over length-prefixed JSON frames, plus
//! push notifications for subscribed clients (the overlay renderer watches
//! frames this way). All pipeline work is delegated to the coordinator.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::classifier::ClassifiedState;
use crate::dispatch::Coordinator;
use crate::events::StateEvent;

use super::protocol::{DaemonStatus, Notification, Request, Response};

/// IPC server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    coordinator: Arc<Coordinator>,
    events: broadcast::Sender<StateEvent>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    last_state: Option<ClassifiedState>,
    start_time: std::time::Instant,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        coordinator: Arc<Coordinator>,
        events: broadcast::Sender<StateEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            last_state: None,
            start_time: std::time::Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            coordinator,
            events,
            shutdown_tx,
        })
    }

    /// Record the most recently dispatched state for status snapshots
    pub async fn set_last_state(&self, state: ClassifiedState) {
        let mut server_state = self.state.write().await;
        if server_state.last_state != Some(state) {
            info!(%state, "status: state updated");
        }
        server_state.last_state = Some(state);
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let coordinator = Arc::clone(&self.coordinator);
                    let events = self.events.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, coordinator, events) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        mut stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        coordinator: Arc<Coordinator>,
        events: broadcast::Sender<StateEvent>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match stream.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > 1024 * 1024 {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            stream.read_exact(&mut msg_buf).await?;

            // Parse request; a malformed frame gets an error response rather
            // than a dropped connection
            let request: Request = match serde_json::from_slice(&msg_buf) {
                Ok(request) => request,
                Err(e) => {
                    let response = Response::Error {
                        code: "bad_request".to_string(),
                        message: e.to_string(),
                    };
                    Self::send_message(&mut stream, &response).await?;
                    continue;
                }
            };

            debug!(?request, "received request");

            // A subscription switches this connection to push-only mode
            if matches!(request, Request::Subscribe) {
                Self::send_message(&mut stream, &Response::Subscribed).await?;
                return Self::push_events(stream, events).await;
            }

            let response = Self::process_request(request, &state, &coordinator).await;
            Self::send_message(&mut stream, &response).await?;
        }
    }

    /// Forward state events to a subscribed client until it disconnects
    async fn push_events(
        mut stream: UnixStream,
        events: broadcast::Sender<StateEvent>,
    ) -> Result<()> {
        let mut event_rx = events.subscribe();
        debug!("client subscribed to notifications");

        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let notification = Notification::StateEvent { event };
                    if Self::send_message(&mut stream, &notification).await.is_err() {
                        debug!("subscriber disconnected");
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber lagged behind event stream");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Ok(());
                }
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<T: serde::Serialize>(stream: &mut UnixStream, msg: &T) -> Result<()> {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        stream.write_all(&msg_len).await?;
        stream.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and build the response
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        coordinator: &Arc<Coordinator>,
    ) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::Telemetry { sample } => {
                match coordinator.classify_and_dispatch(&sample).await {
                    Ok(report) => Response::Dispatched(report),
                    Err(e) => {
                        warn!(?e, "telemetry rejected");
                        Response::Error {
                            code: "invalid_signal".to_string(),
                            message: e.to_string(),
                        }
                    }
                }
            }

            Request::SetState { state: label } => {
                Response::Dispatched(coordinator.set_state(&label).await)
            }

            Request::Stop => Response::Stopped(coordinator.stop_all().await),

            Request::GetStatus => {
                let server_state = state.read().await;
                Response::Status(DaemonStatus {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    last_state: server_state.last_state,
                    audio: coordinator.audio_status().await,
                    overlay_active: coordinator.overlay_available(),
                    uptime_secs: server_state.start_time.elapsed().as_secs(),
                })
            }

            // Handled before dispatch; kept for exhaustiveness
            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::audio::testing::{FakeBackend, FakeResolver};
    use crate::audio::{AudioEngine, AudioHandle};
    use crate::classifier::{FocusModel, StateClassifier};
    use crate::presets::PresetTable;

    fn test_coordinator() -> (Arc<Coordinator>, broadcast::Sender<StateEvent>) {
        let engine = Arc::new(AudioEngine::new(
            Box::new(FakeResolver::ok()),
            Box::new(FakeBackend::default()),
        ));
        let (events, _) = broadcast::channel(64);
        let coordinator = Coordinator::new(
            StateClassifier::new(FocusModel::load(None).unwrap()),
            Arc::new(PresetTable::builtin()),
            AudioHandle::with_engine(engine),
            None,
            events.clone(),
        );
        (Arc::new(coordinator), events)
    }

    async fn send_frame(stream: &mut UnixStream, payload: &serde_json::Value) {
        let bytes = serde_json::to_vec(payload).unwrap();
        stream
            .write_all(&(bytes.len() as u32).to_le_bytes())
            .await
            .unwrap();
        stream.write_all(&bytes).await.unwrap();
    }

    async fn read_frame(stream: &mut UnixStream) -> serde_json::Value {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[tokio::test]
    async fn test_set_state_over_socket() {
        let dir = std::env::temp_dir().join(format!("amplify-test-{}", std::process::id()));
        let socket_path = dir.join("set-state.sock");
        let (coordinator, events) = test_coordinator();

        let server = Server::new(&socket_path, coordinator, events).unwrap();
        let server = Arc::new(server);
        let server_task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.run().await })
        };

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        send_frame(&mut client, &serde_json::json!({"type": "set_state", "state": "tired"}))
            .await;
        let response = read_frame(&mut client).await;

        assert_eq!(response["type"], "dispatched");
        assert_eq!(response["state"], "tired");
        assert_eq!(response["category"], "relaxed");

        server_task.abort();
        server.shutdown().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_response() {
        let dir = std::env::temp_dir().join(format!("amplify-test-bad-{}", std::process::id()));
        let socket_path = dir.join("bad.sock");
        let (coordinator, events) = test_coordinator();

        let server = Arc::new(Server::new(&socket_path, coordinator, events).unwrap());
        let server_task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.run().await })
        };

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        let garbage = b"not json";
        client
            .write_all(&(garbage.len() as u32).to_le_bytes())
            .await
            .unwrap();
        client.write_all(garbage).await.unwrap();

        let response = read_frame(&mut client).await;
        assert_eq!(response["type"], "error");
        assert_eq!(response["code"], "bad_request");

        // The connection survives a bad frame
        send_frame(&mut client, &serde_json::json!({"type": "ping"})).await;
        let response = read_frame(&mut client).await;
        assert_eq!(response["type"], "pong");

        server_task.abort();
        server.shutdown().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_status_reports_audio_and_overlay() {
        let dir = std::env::temp_dir().join(format!("amplify-test-status-{}", std::process::id()));
        let socket_path = dir.join("status.sock");
        let (coordinator, events) = test_coordinator();

        let server = Arc::new(Server::new(&socket_path, coordinator, events).unwrap());
        let server_task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.run().await })
        };

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        send_frame(&mut client, &serde_json::json!({"type": "get_status"})).await;
        let response = read_frame(&mut client).await;

        assert_eq!(response["type"], "status");
        assert_eq!(response["overlay_active"], false);
        assert_eq!(response["audio"]["playing"], false);

        server_task.abort();
        server.shutdown().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
