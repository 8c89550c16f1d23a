//! YAML settings files shared by stemmix hosts
//!
//! ```ignore
//! use stemmix_core::config::{default_config_path, load_config, save_config};
//!
//! let path = default_config_path("player.yaml");
//! let settings: PlayerConfig = load_config(&path);
//! save_config(&settings, &path)?;
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, default_library_path};
