//! Output device settings

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE};

/// Frames per callback when settings leave it open
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

pub const MIN_BUFFER_SIZE: u32 = 64;

/// Which device to open
///
/// `host` pins the lookup to one API (`ALSA`, `JACK`, `CoreAudio`, ...);
/// without it the first device carrying `name` on any host is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl OutputTarget {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), host: None }
    }

    pub fn on_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "[{}] ", host)?;
        }
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// `None` opens the system default output
    pub device: Option<OutputTarget>,
    /// Frames per callback; `None` means [`DEFAULT_BUFFER_SIZE`]
    pub buffer_frames: Option<u32>,
    /// Preferred device rate; `None` means 48 kHz
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    /// Requested callback size, clamped to what the engine pre-allocates
    pub fn callback_frames(&self) -> u32 {
        self.buffer_frames
            .unwrap_or(DEFAULT_BUFFER_SIZE)
            .clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE as u32)
    }

    pub fn target_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_partial_yaml() {
        let yaml = "device:\n  name: hw:1,0\n  host: ALSA\nbuffer_frames: 256\n";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.device, Some(OutputTarget::named("hw:1,0").on_host("ALSA")));
        assert_eq!(config.callback_frames(), 256);
        assert_eq!(config.target_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_callback_frames_clamped() {
        let tiny = AudioConfig { buffer_frames: Some(8), ..Default::default() };
        let huge = AudioConfig { buffer_frames: Some(1 << 20), ..Default::default() };
        assert_eq!(tiny.callback_frames(), MIN_BUFFER_SIZE);
        assert_eq!(huge.callback_frames(), MAX_BUFFER_SIZE as u32);
        assert_eq!(AudioConfig::default().callback_frames(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(OutputTarget::named("Speakers").to_string(), "Speakers");
        assert_eq!(OutputTarget::named("hw:0").on_host("JACK").to_string(), "[JACK] hw:0");
    }
}
