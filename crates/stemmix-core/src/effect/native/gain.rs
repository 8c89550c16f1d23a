//! Gain stage - linear volume multiplier

use crate::effect::Effect;
use crate::types::StereoBuffer;

/// Linear gain
///
/// Used twice per chain: as the pregain at the head and as the stem
/// volume/mute stage at the tail.
#[derive(Debug, Clone)]
pub struct GainStage {
    gain: f32,
}

impl GainStage {
    pub fn new(gain: f32) -> Self {
        Self { gain: gain.max(0.0) }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Effect for GainStage {
    fn process(&mut self, buffer: &mut StereoBuffer) {
        if self.gain == 1.0 {
            return;
        }
        buffer.scale(self.gain);
    }

    fn reset(&mut self) {}
}
