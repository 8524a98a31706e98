//! # Token Channel
//!
//! Line-oriented source of token identifiers. The physical iButton reader is
//! a microcontroller on a serial port that prints one line per event: either
//! the literal heartbeat `ready` or the id of the button touching the probe.
//!
//! Two implementations are provided:
//!
//! - [`SerialChannel`] reads the hardware reader through `serialport`.
//! - [`LineChannel`] reads any text stream, used as a stand-in for the
//!   hardware in debug mode (stdin) and in tests.

use anyhow::{Context, Result};
use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::time::Duration;

/// Serial reads wake up at this interval; timeouts are retried internally.
const SERIAL_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A blocking, line-oriented source of token events.
pub trait TokenChannel {
    /// Block until one full line is available.
    ///
    /// Returns `Ok(None)` once the stream has ended. The line terminator is
    /// not part of the returned string.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Drop any input that has been received but not yet read.
    fn discard_pending(&mut self) -> io::Result<()>;
}

/// Removes a trailing `\n` / `\r\n` from a raw line.
fn strip_terminator(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// Stand-in token channel over any byte stream.
pub struct LineChannel<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> LineChannel<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }
}

impl LineChannel<io::Stdin> {
    /// Debug mode: tokens are typed (or piped) on stdin.
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<R: Read> TokenChannel for LineChannel<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match self.reader.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(strip_terminator(line))),
        }
    }

    fn discard_pending(&mut self) -> io::Result<()> {
        let buffered = self.reader.buffer().len();
        if buffered > 0 {
            debug!("Discarding {buffered} buffered bytes of token input");
        }
        self.reader.consume(buffered);
        Ok(())
    }
}

/// Hardware token reader on a serial port.
pub struct SerialChannel {
    reader: BufReader<Box<dyn SerialPort>>,
    /// Bytes of a line that was cut short by a read timeout.
    partial: Vec<u8>,
}

impl SerialChannel {
    /// Opens the serial device and flushes anything queued before startup.
    ///
    /// A missing or busy device is a fatal startup error.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open serial port {path} at {baud_rate} baud"))?;

        port.clear(ClearBuffer::Input)
            .with_context(|| format!("Failed to flush input on serial port {path}"))?;

        info!("Listening for tokens on {path} ({baud_rate} baud)");
        Ok(Self::from_port(port))
    }

    /// Wraps an already opened port. Reads give up after the port's own
    /// timeout and are retried.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            reader: BufReader::new(port),
            partial: Vec::new(),
        }
    }
}

impl TokenChannel for SerialChannel {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            match self.reader.read_until(b'\n', &mut self.partial) {
                Ok(0) if self.partial.is_empty() => return Ok(None),
                // Either a full line, or the tail of the stream without a terminator.
                Ok(_) => {
                    let raw = std::mem::take(&mut self.partial);
                    let line = String::from_utf8_lossy(&raw).into_owned();
                    return Ok(Some(strip_terminator(line)));
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn discard_pending(&mut self) -> io::Result<()> {
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        self.partial.clear();
        self.reader
            .get_ref()
            .clear(ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}
