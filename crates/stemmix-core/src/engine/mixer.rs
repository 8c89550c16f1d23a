//! Master bus: sums rendered stems and applies master volume
//!
//! There is no normalization, limiting, or headroom compensation for the
//! number of stems. Whatever the sum is, scaled by master volume, goes to
//! the device; clipping is the driver's business.

use crate::types::StereoBuffer;

pub struct MasterBus {
    volume: f32,
}

impl MasterBus {
    pub fn new() -> Self {
        Self { volume: 1.0 }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set master volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = crate::effect::params::clamp_unit(volume);
    }

    /// Sum `sources` into `out` and apply master volume
    ///
    /// `out` is overwritten. Every source must match `out` in length.
    pub fn mix<'a>(&self, sources: impl IntoIterator<Item = &'a StereoBuffer>, out: &mut StereoBuffer) {
        out.fill_silence();
        for source in sources {
            out.add_buffer(source);
        }
        if self.volume != 1.0 {
            out.scale(self.volume);
        }
    }
}

impl Default for MasterBus {
    fn default() -> Self {
        Self::new()
    }
}
