//! Interrupt handling.
//!
//! The main loop may be parked in a blocking token read for hours, so
//! SIGINT and SIGTERM are received on a dedicated watcher thread instead.
//! The watcher performs the teardown itself: the media player is terminated
//! and the control FIFO removed before the process exits.

use anyhow::{Context, Result};
use log::{debug, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::player::PlayerProcess;

/// Pending SIGINT/SIGTERM deliveries.
pub struct ShutdownSignal {
    signals: Signals,
}

impl ShutdownSignal {
    /// Installs the SIGINT/SIGTERM handlers.
    pub fn install() -> Result<Self> {
        let signals =
            Signals::new([SIGINT, SIGTERM]).context("Failed to install SIGINT/SIGTERM handlers")?;
        Ok(Self { signals })
    }

    /// Blocks until an interrupt arrives and returns its number.
    pub fn wait(&mut self) -> Option<i32> {
        self.signals.forever().next()
    }

    /// Spawns the watcher that tears the player down and exits once an
    /// interrupt arrives.
    pub fn spawn_watcher(
        mut self,
        player: Arc<Mutex<PlayerProcess>>,
        fifo: PathBuf,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("shutdown-watcher".to_string())
            .spawn(move || {
                if let Some(signal) = self.wait() {
                    info!("Shutting down (signal {signal})");
                    teardown(&player, &fifo);
                    std::process::exit(0);
                }
            })
            .context("Failed to spawn shutdown watcher")
    }
}

/// Terminates the player and removes the control FIFO.
pub fn teardown(player: &Mutex<PlayerProcess>, fifo: &Path) {
    // A poisoned lock still holds a valid process handle.
    let mut guard = player.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.terminate();
    match std::fs::remove_file(fifo) {
        Ok(()) => debug!("Removed {}", fifo.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove {}: {e}", fifo.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_delivered_to_waiter() {
        let mut signal = ShutdownSignal::install().unwrap();
        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert_eq!(signal.wait(), Some(SIGTERM));
    }

    #[test]
    fn test_teardown_terminates_player_and_removes_fifo() {
        let dir = tempfile::TempDir::new().unwrap();
        let fifo = dir.path().join("mplayer.fifo");
        std::fs::write(&fifo, b"").unwrap();

        let player = Mutex::new(PlayerProcess::spawn("true", &fifo).unwrap());
        teardown(&player, &fifo);

        assert!(player.lock().unwrap().id().is_none());
        assert!(!fifo.exists());
    }

    #[test]
    fn test_teardown_tolerates_missing_or_busy_fifo() {
        let dir = tempfile::TempDir::new().unwrap();
        let player = Mutex::new(PlayerProcess::spawn("true", &dir.path().join("x")).unwrap());

        // Already gone.
        teardown(&player, &dir.path().join("missing.fifo"));

        // A directory cannot be removed with remove_file; the error is only logged.
        let busy = dir.path().join("busy.fifo");
        std::fs::create_dir(&busy).unwrap();
        teardown(&player, &busy);
        assert!(busy.exists());
    }
}
