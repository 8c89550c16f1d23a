//! Session settings

use serde::{Deserialize, Serialize};

use super::order::CANONICAL_STEM_ORDER;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Stem names whose distortion knob is live
    pub distortable_stems: Vec<String>,
    /// Display priority; names not listed sort after these
    pub stem_order: Vec<String>,
    /// Initial master volume
    pub master_volume: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            distortable_stems: vec!["guitar".to_string(), "piano".to_string()],
            stem_order: CANONICAL_STEM_ORDER.iter().map(|s| s.to_string()).collect(),
            master_volume: 1.0,
        }
    }
}

impl SessionConfig {
    pub fn is_distortable(&self, name: &str) -> bool {
        self.distortable_stems
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }
}
