//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Optional path to a focus model file (built-in model used if unset)
    pub model_path: Option<PathBuf>,

    /// Command used to launch the audio player, first element is the binary
    pub player_command: Vec<String>,

    /// Upper bound on a single stream resolution attempt
    pub resolve_timeout: Duration,

    /// Interval between overlay render ticks
    pub overlay_tick: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("amplify");

        let socket_path = data_dir.join("daemon.sock");

        let model_path = std::env::var("AMPLIFY_MODEL").ok().map(PathBuf::from);

        let player_command = std::env::var("AMPLIFY_PLAYER")
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|_| {
                vec![
                    "mpv".to_string(),
                    "--no-video".to_string(),
                    "--really-quiet".to_string(),
                ]
            });

        let resolve_timeout = std::env::var("AMPLIFY_RESOLVE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let overlay_tick = std::env::var("AMPLIFY_OVERLAY_TICK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(100));

        Ok(Self {
            socket_path,
            data_dir,
            model_path,
            player_command,
            resolve_timeout,
            overlay_tick,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
