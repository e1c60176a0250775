//! amplify-daemon: Background daemon for ambient focus amplification
//!
//! The daemon ingests typing/mouse/gaze/idle telemetry over IPC, classifies
//! an attentional state from it, and steers two ambient actuators:
//! - Background audio: one playback session with toggle semantics
//! - Screen overlay: a render loop easing tint color/opacity to a target
//!
//! Commands arrive over a Unix-socket IPC surface; subscribed clients (the
//! overlay renderer among them) receive pipeline events as push
//! notifications.

mod audio;
mod classifier;
mod config;
mod dispatch;
mod events;
mod ipc;
mod lifecycle;
mod overlay;
mod presets;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::AudioHandle;
use crate::classifier::{FocusModel, StateClassifier};
use crate::config::Config;
use crate::dispatch::Coordinator;
use crate::events::StateEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::overlay::{BroadcastSurface, OverlayController};
use crate::presets::PresetTable;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "amplify-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, "configuration loaded");

    // The focus model is loaded once at startup and reused for every
    // classification
    let model = FocusModel::load(config.model_path.as_deref())
        .context("failed to load focus model")?;
    let classifier = StateClassifier::new(model);

    // Immutable deploy-time preset table, shared by reference
    let presets = Arc::new(PresetTable::builtin());

    // Event channel: pipeline and actuators -> IPC subscribers and status
    let (event_tx, _event_rx) = broadcast::channel::<StateEvent>(64);

    // Start the overlay render loop (runs on its own thread); the pipeline
    // continues without visual actuation if it cannot come up
    let overlay = match OverlayController::start(
        config.overlay_tick,
        BroadcastSurface::new(event_tx.clone()),
    ) {
        Ok(handle) => {
            info!("overlay render loop started");
            Some(handle)
        }
        Err(e) => {
            error!(?e, "failed to start overlay");
            warn!("continuing without visual actuation");
            None
        }
    };

    // Audio engine handle; the engine itself is built on the first play
    let audio = AudioHandle::new(config.player_command.clone(), config.resolve_timeout);

    let coordinator = Arc::new(Coordinator::new(
        classifier,
        Arc::clone(&presets),
        audio,
        overlay.as_ref().map(|o| o.commands()),
        event_tx.clone(),
    ));

    // Create IPC server over the coordinator
    let server = Server::new(&config.socket_path, Arc::clone(&coordinator), event_tx.clone())?;

    // Track dispatched states for status snapshots
    let mut status_rx = event_tx.subscribe();

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the status snapshot in sync with dispatched states
        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(StateEvent::StateClassified { state, .. }) => {
                        server.set_last_state(state).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "status event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("status event handler exited");
        }

        // Wait for shutdown signal
        signal = shutdown.wait() => {
            info!(signal, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    coordinator.stop_all().await;
    if let Some(mut overlay) = overlay {
        overlay.stop();
    }
    server.shutdown().await;

    info!("amplify-daemon stopped");

    Ok(())
}
