//! Volume control through ALSA's `amixer` command-line tool.
//!
//! Like the player itself, the mixer is driven as an external command rather
//! than through bindings: `amixer get <control>` reports the level as
//! `[NN%]`, and `amixer set <control> NN%` changes it.

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use std::process::Command;

/// Output volume in percent, `0..=100`.
pub trait VolumeControl {
    fn volume(&mut self) -> Result<u8>;
    fn set_volume(&mut self, level: u8) -> Result<()>;
}

/// Mixer control driven through `amixer`.
#[derive(Debug, Clone)]
pub struct AmixerControl {
    control: String,
}

impl AmixerControl {
    pub fn new(control: &str) -> Self {
        Self {
            control: control.to_string(),
        }
    }

    /// Fails at startup if `amixer` or the control is missing.
    pub fn probe(&mut self) -> Result<u8> {
        self.volume()
            .with_context(|| format!("Mixer control `{}` is not usable", self.control))
    }

    fn amixer(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("amixer")
            .args(args)
            .output()
            .context("Failed to execute amixer. Please install alsa-utils")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("amixer {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// First `[NN%]` in `amixer get` output.
pub fn parse_amixer_volume(output: &str) -> Option<u8> {
    output.split('[').skip(1).find_map(|chunk| {
        let (number, _) = chunk.split_once("%]")?;
        number.trim().parse::<u8>().ok().map(|level| level.min(100))
    })
}

impl VolumeControl for AmixerControl {
    fn volume(&mut self) -> Result<u8> {
        // -M maps the percentage the same way `set` does.
        let output = self.amixer(&["-M", "get", self.control.as_str()])?;
        parse_amixer_volume(&output)
            .ok_or_else(|| anyhow!("No volume level in amixer output for `{}`", self.control))
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        let level = level.min(100);
        debug!("mixer {} -> {level}%", self.control);
        let percent = format!("{level}%");
        self.amixer(&["-q", "-M", "set", self.control.as_str(), percent.as_str()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMIXER_GET: &str = "Simple mixer control 'PCM',0\n  \
        Capabilities: pvolume pvolume-joined pswitch pswitch-joined\n  \
        Playback channels: Mono\n  \
        Limits: Playback -10239 - 400\n  \
        Mono: Playback -1047 [85%] [-10.47dB] [on]\n";

    #[test]
    fn test_parse_amixer_volume() {
        assert_eq!(parse_amixer_volume(AMIXER_GET), Some(85));
    }

    #[test]
    fn test_parse_amixer_volume_stereo_takes_first_channel() {
        let output = "  Front Left: Playback 60 [94%] [on]\n  Front Right: Playback 55 [86%] [on]\n";
        assert_eq!(parse_amixer_volume(output), Some(94));
    }

    #[test]
    fn test_parse_amixer_volume_skips_non_percent_brackets() {
        assert_eq!(parse_amixer_volume("[on] [-3.00dB] [100%]"), Some(100));
        assert_eq!(parse_amixer_volume("[on] [off]"), None);
        assert_eq!(parse_amixer_volume(""), None);
    }
}
