//! Harold: touch your iButton, hear your song.
//!
//! Harold sits next to a door. When someone touches their iButton to the
//! reader, Harold looks up who they are, plays their personal greeting song
//! through `mplayer`, and fades it out after half a minute.
//!
//! Core module:
//! - [`session`] - The idle/playing state machine and fade-out
//!
//! ### Collaborators
//!
//! - [`token_channel`] - Serial iButton reader, or a stand-in text stream
//! - [`identity`] - Token id to username lookup over HTTP
//! - [`song_selector`] - Per-user song directories and the fallback list
//! - [`player`] - `mplayer` slave process and its control FIFO
//! - [`mixer`] - ALSA volume control
//! - [`quiet_hours`] - Lower ambient volume overnight
//! - [`clock`] - Injectable time source
//!
//! ### Supporting Modules
//!
//! - [`config`] - Configuration file and defaults
//! - [`cli`] - Command-line interface definitions with clap
//! - [`shutdown`] - Interrupt handling and player teardown
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use harold::clock::SystemClock;
//! use harold::identity::HttpIdentityResolver;
//! use harold::mixer::AmixerControl;
//! use harold::player::FifoSink;
//! use harold::session::{Collaborators, SessionConfig, SessionController};
//! use harold::song_selector::HomeDirSelector;
//! use harold::token_channel::LineChannel;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let parts = Collaborators {
//!     tokens: Box::new(LineChannel::stdin()),
//!     identities: Box::new(HttpIdentityResolver::new(
//!         "http://www.csh.rit.edu:56124/",
//!         "ibutton",
//!         Duration::from_secs(5),
//!     )),
//!     songs: Box::new(HomeDirSelector::new(Vec::new(), Box::new(rand::thread_rng()))),
//!     player: Box::new(FifoSink::open(Path::new("/tmp/mplayer.fifo"))?),
//!     mixer: Box::new(AmixerControl::new("PCM")),
//! };
//! let mut harold = SessionController::new(SessionConfig::default(), parts, Box::new(SystemClock));
//! loop {
//!     harold.tick();
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Setup functions return `anyhow::Result`; a reader, FIFO or player that
//! cannot be opened at startup is fatal. Once running, nothing a
//! collaborator does can stop the loop: failed lookups play a fallback song,
//! failed commands are logged and the next tick carries on.

pub mod cli;
pub mod clock;
pub mod config;
pub mod identity;
pub mod mixer;
pub mod player;
pub mod quiet_hours;
pub mod session;
pub mod shutdown;
pub mod song_selector;
pub mod token_channel;
