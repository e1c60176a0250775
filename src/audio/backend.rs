//! Player backends
//!
//! The engine drives playback through this trait; the production backend
//! runs the configured player binary as a child process, one session at a
//! time.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::AudioError;

/// A playback device holding at most one active session
pub trait PlayerBackend: Send {
    /// Begin playing `url`, replacing any active session
    fn start(&mut self, url: &str) -> Result<(), AudioError>;

    /// Halt the active session, if any
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Whether a session is currently active
    fn is_active(&mut self) -> bool;
}

/// Production backend: spawns the configured player command with the stream
/// URL appended
#[derive(Debug)]
pub struct ProcessPlayer {
    command: Vec<String>,
    child: Option<Child>,
}

impl ProcessPlayer {
    pub fn new(command: Vec<String>) -> Result<Self, AudioError> {
        if command.is_empty() {
            return Err(AudioError::Init("player command is empty".to_string()));
        }
        Ok(Self {
            command,
            child: None,
        })
    }

    fn halt(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!(?e, "failed to kill player process");
            }
        }
    }
}

impl PlayerBackend for ProcessPlayer {
    fn start(&mut self, url: &str) -> Result<(), AudioError> {
        self.halt();

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| AudioError::Backend(format!("failed to spawn player: {}", e)))?;

        debug!(player = %self.command[0], url, "player session started");
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.halt();
        Ok(())
    }

    fn is_active(&mut self) -> bool {
        match &mut self.child {
            // try_wait returns Ok(None) while the process is still running
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_rejected() {
        let err = ProcessPlayer::new(vec![]).unwrap_err();
        assert!(matches!(err, AudioError::Init(_)));
    }

    #[test]
    fn test_fresh_player_is_inactive() {
        let mut player = ProcessPlayer::new(vec!["mpv".to_string()]).unwrap();
        assert!(!player.is_active());
    }

    #[test]
    fn test_stop_without_session_is_a_no_op() {
        let mut player = ProcessPlayer::new(vec!["mpv".to_string()]).unwrap();
        assert!(player.stop().is_ok());
        assert!(!player.is_active());
    }
}
