//! Reading and writing YAML settings

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read settings from `path`
///
/// Never fails: a missing file, an unreadable file or bad YAML each fall back
/// to `T::default()` with a log line. Types should carry
/// `#[serde(default)]` so a file with only some keys keeps the rest.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("No settings at {:?}, using defaults", path);
        return T::default();
    }

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Cannot read {:?}: {}; using defaults", path, e);
            return T::default();
        }
    };

    match serde_yaml::from_str::<T>(&text) {
        Ok(config) => {
            log::info!("Loaded settings from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("Invalid settings in {:?}: {}; using defaults", path, e);
            T::default()
        }
    }
}

/// Write settings to `path` as YAML, creating missing parent directories
pub fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create settings directory {:?}", dir))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to encode settings as YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {:?}", path))?;

    log::info!("Saved settings to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config: SessionConfig = load_config(&dir.path().join("absent.yaml"));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.yaml");

        let config = SessionConfig {
            distortable_stems: vec!["bass".to_string()],
            master_volume: 0.5,
            ..SessionConfig::default()
        };
        save_config(&config, &path).unwrap();

        let loaded: SessionConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_garbage_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        std::fs::write(&path, "distortable_stems: [unterminated").unwrap();

        let config: SessionConfig = load_config(&path);
        assert_eq!(config, SessionConfig::default());
    }
}
