//! # Command-Line Interface Module
//!
//! Harold takes no subcommands; it starts, listens for iButtons and runs until
//! interrupted. Flags override the configuration file.
//!
//! ```bash
//! harold                       # hardware reader on /dev/ttyACM0
//! harold --debug               # type token ids on stdin instead
//! harold -s /dev/ttyUSB0 -r 115200 --nobeep
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::config::HaroldConfig;

/// Start the Harold system.
///
/// Reads iButton ids from a serial reader, looks up who they belong to and
/// plays that person's song through mplayer, fading it out after a while.
#[derive(Parser, Debug, Default)]
#[command(name = "harold")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Use debug mode: read token ids from stdin instead of the serial reader
    #[arg(short, long)]
    pub debug: bool,

    /// Serial port of the iButton reader [default: /dev/ttyACM0]
    #[arg(short, long, value_name = "PORT", value_hint = clap::ValueHint::FilePath)]
    pub serial: Option<String>,

    /// Baud rate of the serial reader [default: 9600]
    #[arg(short, long, value_name = "BAUD")]
    pub rate: Option<u32>,

    /// FIFO used to send commands to mplayer [default: /tmp/mplayer.fifo]
    #[arg(short, long, value_name = "FIFO", value_hint = clap::ValueHint::FilePath)]
    pub fifo: Option<PathBuf>,

    /// Disable the acknowledgment beep
    #[arg(short, long)]
    pub nobeep: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "FILE", env = "HAROLD_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Applies the flags that were given on top of `config`.
    pub fn apply_to(&self, config: &mut HaroldConfig) {
        if let Some(serial) = &self.serial {
            config.serial_port = serial.clone();
        }
        if let Some(rate) = self.rate {
            config.baud_rate = rate;
        }
        if let Some(fifo) = &self.fifo {
            config.fifo_path = fifo.clone();
        }
        if self.nobeep {
            config.beep = false;
        }
    }
}
