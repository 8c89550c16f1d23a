//! Feed-forward peak compressor

use crate::effect::params::CompressorSettings;
use crate::effect::Effect;
use crate::types::StereoBuffer;

const ATTACK_SECONDS: f32 = 0.003;
const RELEASE_SECONDS: f32 = 0.25;
/// Floor for the envelope before converting to dB
const ENVELOPE_FLOOR: f32 = 1e-9;

/// Hard-knee, stereo-linked compressor
///
/// The detector is a peak envelope follower over `max(|L|, |R|)` so both
/// channels get the same gain and the stereo image stays put. A ratio of 1 or
/// less skips processing entirely, making the neutral setting bit-exact.
#[derive(Debug, Clone)]
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(sample_rate: u32, settings: CompressorSettings) -> Self {
        let sr = sample_rate.max(1) as f32;
        let mut compressor = Self {
            threshold_db: 0.0,
            ratio: 1.0,
            attack_coeff: (-1.0 / (ATTACK_SECONDS * sr)).exp(),
            release_coeff: (-1.0 / (RELEASE_SECONDS * sr)).exp(),
            envelope: 0.0,
        };
        compressor.set_settings(settings);
        compressor
    }

    pub fn settings(&self) -> CompressorSettings {
        CompressorSettings {
            threshold_db: self.threshold_db,
            ratio: self.ratio,
        }
    }

    pub fn set_settings(&mut self, settings: CompressorSettings) {
        self.threshold_db = settings.threshold_db.min(0.0);
        self.ratio = settings.ratio.max(1.0);
    }

    #[inline]
    fn is_neutral(&self) -> bool {
        self.ratio <= 1.0
    }
}

impl Effect for Compressor {
    fn process(&mut self, buffer: &mut StereoBuffer) {
        if self.is_neutral() {
            // Keep the detector quiet so re-enabling does not start from a stale level
            self.envelope = 0.0;
            return;
        }

        let slope = 1.0 / self.ratio - 1.0;

        for sample in buffer.iter_mut() {
            let level = sample.peak();
            let coeff = if level > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let level_db = 20.0 * self.envelope.max(ENVELOPE_FLOOR).log10();
            let over = level_db - self.threshold_db;
            if over > 0.0 {
                let gain = 10f32.powf(over * slope / 20.0);
                *sample *= gain;
            }
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
