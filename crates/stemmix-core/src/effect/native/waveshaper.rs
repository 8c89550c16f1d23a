//! Waveshaper - table-driven static nonlinearity

use crate::effect::params::{distortion_curve, CURVE_RESOLUTION};
use crate::effect::Effect;
use crate::types::StereoBuffer;

/// Maps each sample through a transfer table spanning input `[-1, 1]`
///
/// The table is built on the control thread and handed to the audio thread
/// whole; `process` only reads it. Inputs beyond ±1 are clamped to the table
/// edges, and values between table points are linearly interpolated.
#[derive(Debug, Clone)]
pub struct WaveShaper {
    amount: f32,
    curve: Vec<f32>,
}

impl WaveShaper {
    /// Build the saturation table for a distortion amount
    pub fn new(amount: f32) -> Self {
        Self::with_curve(amount, distortion_curve(amount, CURVE_RESOLUTION))
    }

    pub fn with_curve(amount: f32, curve: Vec<f32>) -> Self {
        debug_assert!(curve.len() >= 2, "waveshaper curve needs at least two points");
        Self { amount, curve }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn curve(&self) -> &[f32] {
        &self.curve
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let last = self.curve.len() - 1;
        let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * last as f32;
        let index = (pos as usize).min(last);
        let next = (index + 1).min(last);
        let frac = pos - index as f32;
        self.curve[index] + frac * (self.curve[next] - self.curve[index])
    }
}

impl Effect for WaveShaper {
    fn process(&mut self, buffer: &mut StereoBuffer) {
        for sample in buffer.iter_mut() {
            sample.left = self.shape(sample.left);
            sample.right = self.shape(sample.right);
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    #[test]
    fn test_identity_curve_interpolates() {
        let mut shaper = WaveShaper::with_curve(0.0, vec![-1.0, 0.0, 1.0]);
        let mut buffer = StereoBuffer::from_interleaved(&[0.25, -0.5]);

        shaper.process(&mut buffer);

        assert!((buffer[0].left - 0.25).abs() < 1e-6);
        assert!((buffer[0].right + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_clamps_out_of_range_input() {
        let mut shaper = WaveShaper::new(20.0);
        let mut buffer = StereoBuffer::from_interleaved(&[3.0, -3.0]);

        shaper.process(&mut buffer);

        assert!((buffer[0].left - 1.0).abs() < 1e-6);
        assert!((buffer[0].right + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_saturation_boosts_quiet_samples() {
        let mut shaper = WaveShaper::new(50.0);
        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::mono(0.1)]);

        shaper.process(&mut buffer);

        // (1 + 50) * 0.1 / (1 + 5) = 0.85
        assert!((buffer[0].left - 0.85).abs() < 0.01);
    }
}
