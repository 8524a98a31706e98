//! # Configuration Module
//!
//! Runtime settings for Harold. Every setting has a built-in default that
//! matches the stock installation (an Arduino reader on `/dev/ttyACM0`,
//! `mplayer` listening on `/tmp/mplayer.fifo`, the CSH lookup service), so
//! no file is needed. Settings are layered:
//!
//! 1. Built-in defaults.
//! 2. A JSON file: `--config FILE`, or `~/.config/harold/config.json` on
//!    Linux if it exists.
//! 3. Command-line flags.
//!
//! Missing keys in the file keep their defaults:
//!
//! ```json
//! {
//!   "serial_port": "/dev/ttyUSB0",
//!   "home_root": "/users/u22",
//!   "fallback_songs": ["/srv/harold/default.mp3"]
//! }
//! ```

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::{
    SessionConfig, DEFAULT_DING, DEFAULT_FADE_THRESHOLD, DEFAULT_VOLUME_FLOOR,
};
use crate::song_selector::{DEFAULT_SONGS, DEFAULT_SONG_NAME, SONG_DIR_NAME};

/// Returns the platform-appropriate default config file path.
///
/// - **Linux**: `~/.config/harold/config.json`
/// - **macOS**: `~/Library/Application Support/harold/config.json`
///
/// The file is optional; this only says where to look.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Pass --config explicitly."
        )
    })?;
    Ok(config_dir.join("harold").join("config.json"))
}

/// Every tunable of a Harold installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaroldConfig {
    /// Serial device of the iButton reader.
    pub serial_port: String,
    pub baud_rate: u32,
    /// Control FIFO the media player reads commands from.
    pub fifo_path: PathBuf,
    pub player_binary: String,
    /// Chime on every reader line.
    pub beep: bool,
    pub ding_path: PathBuf,
    /// Lookup service mapping token ids to usernames.
    pub lookup_endpoint: String,
    /// Query parameter carrying the token id.
    pub lookup_param: String,
    pub lookup_timeout_secs: u64,
    /// Directory of songs inside a user's home.
    pub song_dir_name: String,
    /// Single song file inside a user's home.
    pub default_song_name: String,
    /// Resolve `~user` as `<home_root>/user` instead of via passwd.
    pub home_root: Option<PathBuf>,
    /// Played for unknown users; empty means the built-in list.
    pub fallback_songs: Vec<PathBuf>,
    /// ALSA simple mixer control.
    pub mixer_control: String,
    pub fade_threshold_secs: u64,
    pub volume_floor: u8,
    /// Pause between ticks while a session is playing.
    pub idle_poll_millis: u64,
}

impl Default for HaroldConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            fifo_path: PathBuf::from("/tmp/mplayer.fifo"),
            player_binary: "mplayer".to_string(),
            beep: true,
            ding_path: PathBuf::from(DEFAULT_DING),
            lookup_endpoint: "http://www.csh.rit.edu:56124/".to_string(),
            lookup_param: "ibutton".to_string(),
            lookup_timeout_secs: 5,
            song_dir_name: SONG_DIR_NAME.to_string(),
            default_song_name: DEFAULT_SONG_NAME.to_string(),
            home_root: None,
            fallback_songs: DEFAULT_SONGS.iter().map(PathBuf::from).collect(),
            mixer_control: "PCM".to_string(),
            fade_threshold_secs: DEFAULT_FADE_THRESHOLD.as_secs(),
            volume_floor: DEFAULT_VOLUME_FLOOR,
            idle_poll_millis: 100,
        }
    }
}

impl HaroldConfig {
    /// Loads settings from `path`, or from the default location if `path` is
    /// `None`. A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = get_config_path()?;
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            beep: self.beep,
            ding_path: self.ding_path.clone(),
            fade_threshold: Duration::from_secs(self.fade_threshold_secs),
            volume_floor: self.volume_floor,
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_stock_installation() {
        let config = HaroldConfig::default();
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.fifo_path, PathBuf::from("/tmp/mplayer.fifo"));
        assert!(config.beep);
        assert_eq!(config.fallback_songs.len(), DEFAULT_SONGS.len());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"serial_port": "/dev/ttyUSB0", "home_root": "/users/u22", "volume_floor": 50}"#,
        )
        .unwrap();

        let config = HaroldConfig::load(Some(&path)).unwrap();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert_eq!(config.home_root, Some(PathBuf::from("/users/u22")));
        assert_eq!(config.volume_floor, 50);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.mixer_control, "PCM");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(HaroldConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"baud_rate": "fast"}"#).unwrap();
        assert!(HaroldConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_session_config_conversion() {
        let config = HaroldConfig {
            beep: false,
            fade_threshold_secs: 30,
            volume_floor: 55,
            ..HaroldConfig::default()
        };
        let session = config.session_config();
        assert!(!session.beep);
        assert_eq!(session.fade_threshold, Duration::from_secs(30));
        assert_eq!(session.volume_floor, 55);
    }

    #[test]
    fn test_config_path_structure() {
        if let Ok(path) = get_config_path() {
            assert!(path.ends_with("harold/config.json"));
        }
    }
}
