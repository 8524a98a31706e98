//! # Song Selection
//!
//! Picks the file to play for a resolved user. Users customise their greeting
//! by dropping files in their home directory:
//!
//! - `~user/harold/` holding any number of songs; one is picked at random.
//! - `~user/harold.mp3` as a single song.
//!
//! Anonymous users, and users with neither, get a random pick from a shared
//! fallback list. Selection never fails and never returns an empty path.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::ffi::{CStr, CString, OsStr};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::identity::Identity;

/// Songs played when the user is unknown or has not set one up.
pub const DEFAULT_SONGS: &[&str] = &[
    "/users/u22/stuart/harold.mp3",
    "/users/u22/henry/harold.mp3",
    "/users/u22/mbillow/harold.mp3",
    "/users/u22/henry/harold/selfie.mp3",
    "/users/u22/henry/harold/waka.mp3",
    "/users/u22/henry/harold/topworld.mp3",
    "/users/u22/henry/harold/heybrother.mp3",
    "/users/u22/henry/harold/boomclap.mp3",
    "/users/u22/henry/harold/starships.mp3",
    "/users/u22/henry/harold/domino.mp3",
    "/users/u22/henry/harold/cruise.mp3",
];

/// File name suffixes accepted inside a user's song directory.
pub const SONG_EXTS: &[&str] = &[
    ".mp3", ".mp4", ".m4a", ".m4p", ".flac", ".ogg", ".oga", ".wav", ".wma",
];

pub const SONG_DIR_NAME: &str = "harold";
pub const DEFAULT_SONG_NAME: &str = "harold.mp3";

pub trait SongSelector {
    fn select(&mut self, identity: &Identity) -> PathBuf;
}

/// True if the file name carries one of [`SONG_EXTS`].
///
/// Names are compared as raw bytes, so songs whose names are not valid
/// UTF-8 still qualify.
pub fn is_song_file(name: impl AsRef<OsStr>) -> bool {
    let name = name.as_ref().as_bytes();
    SONG_EXTS.iter().any(|ext| name.ends_with(ext.as_bytes()))
}

/// Initial and maximum scratch sizes for `getpwnam_r`.
const PASSWD_BUF_START: usize = 4096;
const PASSWD_BUF_MAX: usize = 1 << 20;

/// Home directory of `username` from the passwd database.
fn passwd_home(username: &str) -> Option<PathBuf> {
    let name = CString::new(username).ok()?;
    // SAFETY: `passwd` is plain old data; getpwnam_r fills it in.
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    let mut buf = vec![0 as libc::c_char; PASSWD_BUF_START];

    loop {
        // SAFETY: every pointer refers to live, correctly sized storage.
        let rc = unsafe {
            libc::getpwnam_r(
                name.as_ptr(),
                &mut pwd,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        match rc {
            0 => break,
            libc::ERANGE if buf.len() < PASSWD_BUF_MAX => {
                let grown = buf.len() * 2;
                buf.resize(grown, 0);
            }
            _ => {
                warn!(
                    "passwd lookup for {username} failed: {}",
                    std::io::Error::from_raw_os_error(rc)
                );
                return None;
            }
        }
    }
    if result.is_null() || pwd.pw_dir.is_null() {
        debug!("{username} has no passwd entry");
        return None;
    }

    // SAFETY: pw_dir points into `buf`, which outlives this borrow.
    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(PathBuf::from(OsStr::from_bytes(dir.to_bytes())))
}

/// Eligible songs in `dir`, sorted so a seeded pick is reproducible.
fn list_songs(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read song directory {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut songs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.file_name().is_some_and(|name| is_song_file(name)))
        .collect();
    songs.sort();
    songs
}

/// Selector following the home directory conventions above.
pub struct HomeDirSelector {
    /// When set, `~user` is `home_root/user` instead of the passwd entry.
    home_root: Option<PathBuf>,
    song_dir_name: String,
    default_song_name: String,
    fallback: Vec<PathBuf>,
    rng: Box<dyn RngCore>,
}

impl HomeDirSelector {
    /// Builds a selector; an empty `fallback` is replaced by [`DEFAULT_SONGS`].
    pub fn new(fallback: Vec<PathBuf>, rng: Box<dyn RngCore>) -> Self {
        let fallback = if fallback.is_empty() {
            DEFAULT_SONGS.iter().map(PathBuf::from).collect()
        } else {
            fallback
        };
        Self {
            home_root: None,
            song_dir_name: SONG_DIR_NAME.to_string(),
            default_song_name: DEFAULT_SONG_NAME.to_string(),
            fallback,
            rng,
        }
    }

    pub fn with_home_root(mut self, home_root: Option<PathBuf>) -> Self {
        self.home_root = home_root;
        self
    }

    pub fn with_layout(mut self, song_dir_name: &str, default_song_name: &str) -> Self {
        self.song_dir_name = song_dir_name.to_string();
        self.default_song_name = default_song_name.to_string();
        self
    }

    pub fn fallback(&self) -> &[PathBuf] {
        &self.fallback
    }

    fn home_of(&self, username: &str) -> Option<PathBuf> {
        match &self.home_root {
            Some(root) => Some(root.join(username)),
            None => passwd_home(username),
        }
    }

    /// The user's own song, if they have one set up.
    fn user_song(&mut self, username: &str) -> Option<PathBuf> {
        let home = self.home_of(username)?;
        let song_dir = home.join(&self.song_dir_name);
        let song_file = home.join(&self.default_song_name);

        if song_dir.is_dir() {
            let playlist = list_songs(&song_dir);
            if let Some(song) = playlist.choose(&mut self.rng) {
                return Some(song.clone());
            }
            debug!("{} has no playable songs", song_dir.display());
        }
        if song_file.is_file() {
            return Some(song_file);
        }
        None
    }

    fn fallback_song(&mut self) -> PathBuf {
        self.fallback
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SONGS[0]))
    }
}

impl SongSelector for HomeDirSelector {
    fn select(&mut self, identity: &Identity) -> PathBuf {
        if let Some(username) = identity.username() {
            if let Some(song) = self.user_song(username) {
                return song;
            }
            debug!("No personal song for {username}, using fallback list");
        }
        self.fallback_song()
    }
}
