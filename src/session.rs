//! # Playback Session Controller
//!
//! The heart of Harold: a two-state machine driven by repeated calls to
//! [`SessionController::tick`].
//!
//! ```text
//!            token line                    elapsed >= fade threshold
//!   Idle ───────────────────▶ Playing ─────────────────────────────▶ Idle
//!    ▲  │                                 (fade, stop, discard input)
//!    └──┘ "ready" heartbeat
//! ```
//!
//! Every tick first applies the ambient volume from the quiet hours policy.
//! While idle, the tick blocks on the token channel; a token resolves to a
//! user, a song is chosen and handed to the player, and the session starts.
//! While playing, the tick returns immediately until the fade threshold has
//! passed, then ramps the volume down, stops the player and drops any token
//! presented in the meantime.
//!
//! Collaborator failures never escape a tick. They are logged and the
//! controller carries on with a sensible default.

use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::identity::{Identity, IdentityResolver};
use crate::mixer::VolumeControl;
use crate::player::{PlaybackSink, DEFAULT_SETTLE, SONG_SETTLE};
use crate::quiet_hours;
use crate::song_selector::SongSelector;
use crate::token_channel::TokenChannel;

/// Line the reader prints when it is alive but no button is present.
pub const HEARTBEAT: &str = "ready";

/// Pause between two fade steps.
pub const FADE_STEP: Duration = Duration::from_millis(100);

pub const DEFAULT_FADE_THRESHOLD: Duration = Duration::from_secs(25);
pub const DEFAULT_VOLUME_FLOOR: u8 = 60;
pub const DEFAULT_DING: &str = "/home/pi/ding.mp3";

/// Tunables for the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Play the acknowledgment chime whenever the reader sends a line.
    pub beep: bool,
    pub ding_path: PathBuf,
    /// How long a song plays before the fade starts.
    pub fade_threshold: Duration,
    /// The fade stops once the volume is at or below this level.
    pub volume_floor: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            beep: true,
            ding_path: PathBuf::from(DEFAULT_DING),
            fade_threshold: DEFAULT_FADE_THRESHOLD,
            volume_floor: DEFAULT_VOLUME_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
}

/// One playback cycle, from token recognition to fade-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub start_time: Instant,
    pub fade_threshold: Duration,
    pub volume_floor: u8,
}

impl Session {
    fn fade_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start_time) >= self.fade_threshold
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The reader sent its heartbeat; still idle.
    Heartbeat,
    /// A token started a new session.
    Started { identity: Identity, song: PathBuf },
    /// A session is playing and the fade is not due yet.
    Waiting,
    /// The session faded out and the controller is idle again.
    FadedOut,
    /// The token stream has ended; no further sessions can start.
    ChannelClosed,
    /// Reading the token channel failed; still idle.
    ChannelError,
}

/// The collaborators a controller drives.
pub struct Collaborators {
    pub tokens: Box<dyn TokenChannel>,
    pub identities: Box<dyn IdentityResolver>,
    pub songs: Box<dyn SongSelector>,
    pub player: Box<dyn PlaybackSink>,
    pub mixer: Box<dyn VolumeControl>,
}

/// Volumes applied during a fade from `start` down to `floor`.
///
/// Each step lowers the level by `1 + (100 - v) / 3`, computed in floating
/// point and truncated to a whole volume before the next step. The descent
/// is gentle near full volume and steepens as it goes. The returned levels
/// are strictly decreasing and all above `floor`.
pub fn fade_ramp(start: u8, floor: u8) -> Vec<u8> {
    let floor = i32::from(floor);
    let mut level = i32::from(start.min(100));
    let mut levels = Vec::new();

    while level > floor {
        // `level` is within floor+1..=100 here, so the cast is lossless.
        levels.push(level as u8);
        let decrement = 1.0 + (100.0 - f64::from(level)) / 3.0;
        level = (f64::from(level) - decrement) as i32;
    }
    levels
}

/// Owns the session state and every collaborator it talks to.
pub struct SessionController {
    config: SessionConfig,
    parts: Collaborators,
    clock: Box<dyn Clock>,
    session: Option<Session>,
}

impl SessionController {
    pub fn new(config: SessionConfig, parts: Collaborators, clock: Box<dyn Clock>) -> Self {
        Self {
            config,
            parts,
            clock,
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.session {
            Some(_) => SessionState::Playing,
            None => SessionState::Idle,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Advance the state machine by one step.
    ///
    /// Blocks on the token channel while idle. While playing it returns
    /// promptly unless the fade is due, in which case it runs the whole fade
    /// before returning.
    pub fn tick(&mut self) -> TickOutcome {
        // Lower the volume during quiet hours.
        let ambient = quiet_hours::ambient_volume(&self.clock.local_time());
        if let Err(e) = self.parts.mixer.set_volume(ambient) {
            warn!("Could not set ambient volume to {ambient}: {e:#}");
        }

        match self.session {
            None => self.poll_token(),
            Some(session) if session.fade_due(self.clock.now()) => {
                self.fade_out(session, ambient)
            }
            Some(_) => TickOutcome::Waiting,
        }
    }

    fn poll_token(&mut self) -> TickOutcome {
        let line = match self.parts.tokens.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Token channel closed");
                return TickOutcome::ChannelClosed;
            }
            Err(e) => {
                warn!("Failed to read token channel: {e}");
                return TickOutcome::ChannelError;
            }
        };
        info!("Token event: {line:?}");

        if self.config.beep {
            if let Err(e) = self.parts.player.load(&self.config.ding_path, DEFAULT_SETTLE) {
                warn!("Could not play acknowledgment chime: {e:#}");
            }
        }

        if line.trim() == HEARTBEAT {
            return TickOutcome::Heartbeat;
        }

        let identity = self.parts.identities.resolve(&line);
        info!("New user: '{identity}'");

        let song = self.parts.songs.select(&identity);
        info!("Now playing '{}'...", song.display());
        if let Err(e) = self.parts.player.load(&song, SONG_SETTLE) {
            warn!("Could not start '{}': {e:#}", song.display());
        }

        self.session = Some(Session {
            start_time: self.clock.now(),
            fade_threshold: self.config.fade_threshold,
            volume_floor: self.config.volume_floor,
        });
        TickOutcome::Started { identity, song }
    }

    fn fade_out(&mut self, session: Session, ambient: u8) -> TickOutcome {
        let start = match self.parts.mixer.volume() {
            Ok(level) => level,
            Err(e) => {
                warn!("Could not read volume, fading from {ambient}: {e:#}");
                ambient
            }
        };

        let ramp = fade_ramp(start, session.volume_floor);
        debug!("Fading out over {} steps from {start}", ramp.len());
        for level in ramp {
            if let Err(e) = self.parts.mixer.set_volume(level) {
                warn!("Could not set fade volume {level}: {e:#}");
            }
            self.clock.sleep(FADE_STEP);
        }

        if let Err(e) = self.parts.player.stop(DEFAULT_SETTLE) {
            warn!("Could not stop player: {e:#}");
        }
        self.session = None;

        // A button touched during the fade must not start another session.
        if let Err(e) = self.parts.tokens.discard_pending() {
            warn!("Could not discard pending token input: {e}");
        }
        info!("Stopped");
        TickOutcome::FadedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_ramp_from_full_volume() {
        assert_eq!(
            fade_ramp(100, 60),
            vec![100, 99, 97, 95, 92, 88, 83, 76, 67]
        );
    }

    #[test]
    fn test_fade_ramp_strictly_decreasing_and_bounded() {
        for start in 0..=100u8 {
            for floor in [0u8, 30, 60, 85, 99] {
                let ramp = fade_ramp(start, floor);
                assert!(ramp.len() < 40, "start {start} floor {floor}: {ramp:?}");
                assert!(ramp.windows(2).all(|w| w[0] > w[1]));
                assert!(ramp.iter().all(|&level| level > floor));
                if start > floor {
                    assert_eq!(ramp.first(), Some(&start));
                }
            }
        }
    }

    #[test]
    fn test_fade_ramp_at_or_below_floor_is_empty() {
        assert!(fade_ramp(60, 60).is_empty());
        assert!(fade_ramp(40, 60).is_empty());
    }

    #[test]
    fn test_fade_ramp_from_quiet_volume() {
        assert_eq!(fade_ramp(85, 60), vec![85, 79, 71]);
    }

    #[test]
    fn test_fade_ramp_clamps_overdriven_start() {
        assert_eq!(fade_ramp(150, 60), fade_ramp(100, 60));
    }

    #[test]
    fn test_session_fade_due() {
        let start = Instant::now();
        let session = Session {
            start_time: start,
            fade_threshold: DEFAULT_FADE_THRESHOLD,
            volume_floor: DEFAULT_VOLUME_FLOOR,
        };
        assert!(!session.fade_due(start));
        assert!(!session.fade_due(start + Duration::from_secs(24)));
        assert!(session.fade_due(start + Duration::from_secs(25)));
        assert!(session.fade_due(start + Duration::from_secs(26)));
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.beep);
        assert_eq!(config.fade_threshold, Duration::from_secs(25));
        assert_eq!(config.volume_floor, 60);
        assert_eq!(config.ding_path, PathBuf::from("/home/pi/ding.mp3"));
    }
}
