//! # Harold
//!
//! Kiosk runner: sets up the reader, the lookup service, the media player and
//! the mixer, then drives the session controller until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! # Hardware reader
//! harold --serial /dev/ttyACM0 --rate 9600
//!
//! # Type token ids by hand
//! RUST_LOG=debug harold --debug --nobeep
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::thread;

use harold::cli::Args;
use harold::clock::SystemClock;
use harold::config::HaroldConfig;
use harold::identity::HttpIdentityResolver;
use harold::mixer::AmixerControl;
use harold::player::{self, FifoSink, PlayerProcess};
use harold::session::{Collaborators, SessionController, TickOutcome};
use harold::shutdown::{self, ShutdownSignal};
use harold::song_selector::HomeDirSelector;
use harold::token_channel::{LineChannel, SerialChannel, TokenChannel};

/// Main entry point for Harold.
///
/// Logging is controlled through `RUST_LOG` and defaults to `info`:
/// - `RUST_LOG=debug harold` - Show player commands and mixer changes
/// - `RUST_LOG=harold::identity=debug harold` - Show lookup URLs only
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = HaroldConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    let signal = ShutdownSignal::install()?;

    player::create_fifo(&config.fifo_path)?;
    let player = Arc::new(Mutex::new(PlayerProcess::spawn(
        &config.player_binary,
        &config.fifo_path,
    )?));
    signal.spawn_watcher(Arc::clone(&player), config.fifo_path.clone())?;

    let result = serve(&args, &config, &player);
    shutdown::teardown(&player, &config.fifo_path);
    result
}

/// Opens the remaining channels and runs the main loop.
///
/// Returns when the stand-in token stream ends; interrupts are handled by the
/// shutdown watcher.
fn serve(args: &Args, config: &HaroldConfig, player: &Mutex<PlayerProcess>) -> Result<()> {
    // Blocks until mplayer has opened its end of the FIFO.
    let sink = FifoSink::open(&config.fifo_path)?;
    player
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .ensure_running()?;

    let tokens: Box<dyn TokenChannel> = if args.debug {
        info!("Debug mode: reading tokens from stdin");
        Box::new(LineChannel::stdin())
    } else {
        Box::new(SerialChannel::open(&config.serial_port, config.baud_rate)?)
    };

    let mut mixer = AmixerControl::new(&config.mixer_control);
    let level = mixer.probe()?;
    info!("Mixer `{}` at {level}%", config.mixer_control);

    let songs = HomeDirSelector::new(
        config.fallback_songs.clone(),
        Box::new(StdRng::from_entropy()),
    )
    .with_home_root(config.home_root.clone())
    .with_layout(&config.song_dir_name, &config.default_song_name);

    let identities = HttpIdentityResolver::new(
        &config.lookup_endpoint,
        &config.lookup_param,
        config.lookup_timeout(),
    );

    let parts = Collaborators {
        tokens,
        identities: Box::new(identities),
        songs: Box::new(songs),
        player: Box::new(sink),
        mixer: Box::new(mixer),
    };
    let mut harold = SessionController::new(config.session_config(), parts, Box::new(SystemClock));

    info!("Harold is ready");
    loop {
        match harold.tick() {
            TickOutcome::ChannelClosed => break,
            // Nothing blocks in these cases; don't spin.
            TickOutcome::Waiting | TickOutcome::ChannelError => thread::sleep(config.idle_poll()),
            TickOutcome::Heartbeat | TickOutcome::Started { .. } | TickOutcome::FadedOut => {}
        }
    }

    info!("Token input ended");
    Ok(())
}
