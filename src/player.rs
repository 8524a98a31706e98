//! # Media Player Control
//!
//! Playback is delegated to a long-lived `mplayer` running in slave mode,
//! reading commands from a named pipe:
//!
//! ```text
//! mplayer -idle -slave -input file=/tmp/mplayer.fifo
//! ```
//!
//! Commands are written one per line (`loadfile '<path>'`, `stop`). After
//! every write the caller waits a short settle delay so the player is not
//! flooded faster than it consumes its input.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Settle delay after an ordinary command.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Settle delay after starting a song, long enough for playback to begin.
pub const SONG_SETTLE: Duration = Duration::from_secs(3);

/// A command in the player's slave protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Interrupt current playback and start `path`.
    LoadFile(PathBuf),
    Stop,
}

impl PlayerCommand {
    /// Wire form of the command, without the trailing newline.
    ///
    /// Paths are single-quoted; embedded single quotes are backslash-escaped
    /// so they cannot terminate the argument early.
    pub fn render(&self) -> String {
        match self {
            PlayerCommand::LoadFile(path) => {
                let path = path.to_string_lossy().replace('\'', "\\'");
                format!("loadfile '{path}'")
            }
            PlayerCommand::Stop => "stop".to_string(),
        }
    }
}

/// Write side of the player's command channel.
pub trait PlaybackSink {
    /// Send one command, then wait `settle` before returning.
    fn send(&mut self, command: &PlayerCommand, settle: Duration) -> Result<()>;

    fn load(&mut self, path: &Path, settle: Duration) -> Result<()> {
        self.send(&PlayerCommand::LoadFile(path.to_path_buf()), settle)
    }

    fn stop(&mut self, settle: Duration) -> Result<()> {
        self.send(&PlayerCommand::Stop, settle)
    }
}

/// Sink writing commands into any byte stream, normally the control FIFO.
pub struct FifoSink<W: Write> {
    writer: W,
}

impl<W: Write> FifoSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl FifoSink<File> {
    /// Opens the FIFO for writing.
    ///
    /// Blocks until the player has opened the other end for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open player control FIFO {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write> PlaybackSink for FifoSink<W> {
    fn send(&mut self, command: &PlayerCommand, settle: Duration) -> Result<()> {
        let line = command.render();
        debug!("player <- {line}");
        writeln!(self.writer, "{line}").context("Failed to write player command")?;
        self.writer.flush().context("Failed to flush player command")?;
        std::thread::sleep(settle);
        Ok(())
    }
}

/// Creates the control FIFO at `path`, replacing any stale file there.
pub fn create_fifo(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed stale FIFO {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to remove old FIFO {}", path.display()))
        }
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .with_context(|| format!("FIFO path contains a NUL byte: {}", path.display()))?;
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call.
    if unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) } != 0 {
        let err = std::io::Error::last_os_error();
        return Err(err).with_context(|| format!("Failed to create FIFO {}", path.display()));
    }
    Ok(())
}

/// The external media player process.
///
/// Terminated on [`PlayerProcess::terminate`] or when dropped, so it never
/// outlives its owner.
#[derive(Debug)]
pub struct PlayerProcess {
    child: Option<Child>,
}

impl PlayerProcess {
    /// Spawns `<binary> -idle -slave -input file=<fifo>` with stdout discarded.
    pub fn spawn(binary: &str, fifo: &Path) -> Result<Self> {
        let child = Command::new(binary)
            .args(["-idle", "-slave", "-input"])
            .arg(format!("file={}", fifo.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start `{binary}`. Is it installed?"))?;

        info!("Started {binary} (pid {})", child.id());
        Ok(Self { child: Some(child) })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Fails if the player has already exited.
    pub fn ensure_running(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            bail!("Player process was already terminated");
        };
        if let Some(status) = child.try_wait().context("Failed to poll player process")? {
            bail!("Player process exited unexpectedly ({status})");
        }
        Ok(())
    }

    /// Kills and reaps the player. Safe to call more than once.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        if let Err(e) = child.kill() {
            // Already exited on its own.
            debug!("kill({pid}) failed: {e}");
        }
        match child.wait() {
            Ok(status) => info!("Player process {pid} stopped ({status})"),
            Err(e) => warn!("Failed to reap player process {pid}: {e}"),
        }
    }
}

impl Drop for PlayerProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
