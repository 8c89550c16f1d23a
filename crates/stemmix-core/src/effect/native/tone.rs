//! Tone stage - two-pole low-pass

use crate::effect::params::TONE_OPEN_HZ;
use crate::effect::Effect;
use crate::types::StereoBuffer;

/// Butterworth damping for a flat passband
const TONE_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Trapezoidal state-variable filter, low-pass output only
#[derive(Debug, Clone, Default)]
struct SvfLowpass {
    // State per channel
    ic1eq_l: f32,
    ic2eq_l: f32,
    ic1eq_r: f32,
    ic2eq_r: f32,
    // Coefficients
    a1: f32,
    a2: f32,
    a3: f32,
}

impl SvfLowpass {
    fn set_params(&mut self, cutoff: f32, q: f32, sample_rate: f32) {
        let g = (std::f32::consts::PI * cutoff / sample_rate).tan();
        let k = 1.0 / q;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    #[inline]
    fn tick(a1: f32, a2: f32, a3: f32, x: f32, ic1eq: &mut f32, ic2eq: &mut f32) -> f32 {
        let v3 = x - *ic2eq;
        let v1 = a1 * *ic1eq + a2 * v3;
        let v2 = *ic2eq + a2 * *ic1eq + a3 * v3;
        *ic1eq = 2.0 * v1 - *ic1eq;
        *ic2eq = 2.0 * v2 - *ic2eq;
        v2
    }

    #[inline]
    fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let (a1, a2, a3) = (self.a1, self.a2, self.a3);
        let l = Self::tick(a1, a2, a3, left, &mut self.ic1eq_l, &mut self.ic2eq_l);
        let r = Self::tick(a1, a2, a3, right, &mut self.ic1eq_r, &mut self.ic2eq_r);
        (l, r)
    }

    fn reset(&mut self) {
        self.ic1eq_l = 0.0;
        self.ic2eq_l = 0.0;
        self.ic1eq_r = 0.0;
        self.ic2eq_r = 0.0;
    }
}

/// Low-pass tone control
///
/// The requested cutoff is kept as-is for reporting; the filter itself runs
/// at `min(cutoff, 0.45 · sample_rate)`. At [`TONE_OPEN_HZ`] and above the
/// stage is a pass-through and the filter does not run at all.
#[derive(Debug, Clone)]
pub struct ToneFilter {
    sample_rate: f32,
    cutoff_hz: f32,
    filter: SvfLowpass,
}

impl ToneFilter {
    pub fn new(sample_rate: u32, cutoff_hz: f32) -> Self {
        let mut tone = Self {
            sample_rate: sample_rate.max(1) as f32,
            cutoff_hz,
            filter: SvfLowpass::default(),
        };
        tone.set_cutoff(cutoff_hz);
        tone
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Fully open; `process` leaves the signal untouched
    pub fn is_open(&self) -> bool {
        self.cutoff_hz >= TONE_OPEN_HZ
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if self.is_open() && cutoff_hz < TONE_OPEN_HZ {
            // Leaving pass-through; don't resume from stale filter memory
            self.filter.reset();
        }
        self.cutoff_hz = cutoff_hz;
        let effective = cutoff_hz.clamp(20.0, self.sample_rate * 0.45);
        self.filter.set_params(effective, TONE_Q, self.sample_rate);
    }
}

impl Effect for ToneFilter {
    fn process(&mut self, buffer: &mut StereoBuffer) {
        if self.is_open() {
            return;
        }
        for sample in buffer.iter_mut() {
            let (l, r) = self.filter.process(sample.left, sample.right);
            sample.left = l;
            sample.right = r;
        }
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    fn nyquist(len: usize) -> StereoBuffer {
        let samples = (0..len)
            .map(|i| StereoSample::mono(if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        StereoBuffer::from_vec(samples)
    }

    fn mean_abs(buffer: &StereoBuffer) -> f32 {
        buffer.iter().map(|s| s.left.abs()).sum::<f32>() / buffer.len() as f32
    }

    #[test]
    fn test_low_cutoff_attenuates_highs() {
        let mut tone = ToneFilter::new(48000, 300.0);
        let mut buffer = nyquist(256);

        tone.process(&mut buffer);

        assert!(mean_abs(&buffer) < 0.05, "LP should attenuate Nyquist");
    }

    #[test]
    fn test_dc_passes() {
        let mut tone = ToneFilter::new(48000, 1000.0);
        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::mono(0.5); 4800]);

        tone.process(&mut buffer);

        assert!((buffer[4799].left - 0.5).abs() < 0.01);
        assert!((buffer[4799].right - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut a = ToneFilter::new(44100, 2000.0);
        let mut b = ToneFilter::new(44100, 2000.0);

        let mut warmup = nyquist(64);
        a.process(&mut warmup);
        a.reset();

        let mut out_a = nyquist(64);
        let mut out_b = nyquist(64);
        a.process(&mut out_a);
        b.process(&mut out_b);

        assert_eq!(out_a.as_slice(), out_b.as_slice());
    }

    #[test]
    fn test_open_cutoff_is_reported_unclamped() {
        let tone = ToneFilter::new(22050, 20_000.0);
        assert_eq!(tone.cutoff_hz(), 20_000.0);
    }

    #[test]
    fn test_open_tone_is_exact_pass_through() {
        let mut tone = ToneFilter::new(44100, TONE_OPEN_HZ);
        assert!(tone.is_open());

        let input = nyquist(256);
        let mut buffer = input.clone();
        tone.process(&mut buffer);
        assert_eq!(buffer, input);
    }

    #[test]
    fn test_closing_after_open_starts_clean() {
        let mut reopened = ToneFilter::new(48000, 2000.0);
        let mut warmup = nyquist(64);
        reopened.process(&mut warmup);
        reopened.set_cutoff(TONE_OPEN_HZ);
        reopened.set_cutoff(300.0);
        assert!(!reopened.is_open());

        let mut fresh = ToneFilter::new(48000, 300.0);
        let mut out_a = nyquist(64);
        let mut out_b = nyquist(64);
        reopened.process(&mut out_a);
        fresh.process(&mut out_b);
        assert_eq!(out_a, out_b);
    }
}
