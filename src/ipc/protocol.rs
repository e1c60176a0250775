//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::audio::AudioStatus;
use crate::classifier::ClassifiedState;
use crate::dispatch::{DispatchReport, StopReport};
use crate::events::StateEvent;

/// Requests from clients to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// A telemetry sample: aggregate, classify, and drive the actuators
    Telemetry { sample: serde_json::Value },

    /// Drive the actuators from a raw state label
    SetState { state: String },

    /// Halt playback and fade the overlay out
    Stop,

    /// Request current daemon status
    GetStatus,

    /// Ping to check connectivity
    Ping,

    /// Switch this connection to push notifications
    Subscribe,
}

/// Responses from the daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// A state was dispatched to the actuators
    Dispatched(DispatchReport),

    /// Both actuators were stopped
    Stopped(StopReport),

    /// Current daemon status
    Status(DaemonStatus),

    /// Pong response to ping
    Pong,

    /// Subscription confirmed; notifications follow
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification for subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Pipeline or actuator event. The event is nested so its own tag does
    /// not collide with the notification tag.
    StateEvent { event: StateEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Most recently dispatched state
    pub last_state: Option<ClassifiedState>,

    /// Audio actuator snapshot
    pub audio: AudioStatus,

    /// Whether the overlay render loop is up
    pub overlay_active: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            last_state: None,
            audio: AudioStatus {
                current: None,
                playing: false,
            },
            overlay_active: false,
            uptime_secs: 0,
        }
    }
}
