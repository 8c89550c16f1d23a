//! Player configuration
//!
//! Stored as YAML under the user config directory, by default
//! `~/.config/stemmix/player.yaml`. Every section is optional.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use stemmix_core::audio::AudioConfig;
use stemmix_core::config::{default_config_path, default_library_path};
use stemmix_core::session::SessionConfig;

pub const CONFIG_FILE: &str = "player.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device settings
    pub audio: AudioConfig,
    /// Stem ordering, distortable stems, starting master volume
    pub session: SessionConfig,
    pub display: DisplayConfig,
    /// Folder scanned when no path is given on the command line
    pub library_path: PathBuf,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            session: SessionConfig::default(),
            display: DisplayConfig::default(),
            library_path: default_library_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Columns in the text waveform
    pub waveform_width: usize,
    /// Cursor refresh interval in milliseconds
    pub redraw_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            waveform_width: 64,
            redraw_ms: 100,
        }
    }
}

pub fn default_player_config_path() -> PathBuf {
    default_config_path(CONFIG_FILE)
}

pub fn load_config(path: &Path) -> PlayerConfig {
    let config: PlayerConfig = stemmix_core::config::load_config(path);
    log::info!(
        "Player config: library {:?}, redraw every {}ms, {} distortable stems",
        config.library_path,
        config.display.redraw_ms,
        config.session.distortable_stems.len()
    );
    config
}

pub fn save_config(config: &PlayerConfig, path: &Path) -> Result<()> {
    stemmix_core::config::save_config(config, path)
}
