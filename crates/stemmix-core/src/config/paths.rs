//! Default locations

use std::path::PathBuf;

/// `<user config dir>/stemmix`, or `./stemmix` when the platform has none
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stemmix")
}

pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

/// `~/Music/stemmix`: one sub-directory of stem files per song
pub fn default_library_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Music")
        .join("stemmix")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_under_app_dir() {
        let path = default_config_path("player.yaml");
        assert!(path.ends_with("stemmix/player.yaml"));
    }

    #[test]
    fn test_library_path() {
        assert!(default_library_path().ends_with("Music/stemmix"));
    }
}
