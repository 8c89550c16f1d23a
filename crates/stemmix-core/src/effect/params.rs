//! Knob state and knob → DSP parameter mapping
//!
//! Every knob is a normalized `[0, 1]` value. The functions here turn a knob
//! value into the concrete setting a stage runs with. They are pure so the
//! control thread can compute a setting once and ship it to the audio thread.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pre-amplification range (linear multiplier)
pub const PREGAIN_MIN: f32 = 0.2;
pub const PREGAIN_MAX: f32 = 4.0;
/// Pregain while bypassed
pub const NEUTRAL_PREGAIN: f32 = 1.0;

/// Threshold reached with the compression knob fully open (dBFS)
pub const COMPRESSOR_FLOOR_DB: f32 = -50.0;
pub const COMPRESSOR_MAX_RATIO: f32 = 20.0;

/// Low-pass sweep of the tone knob (Hz)
pub const TONE_MIN_HZ: f32 = 300.0;
pub const TONE_MAX_HZ: f32 = 10_000.0;
/// Cutoff used while bypassed; the filter clamps it below Nyquist
pub const TONE_OPEN_HZ: f32 = 20_000.0;

/// Saturation amount at full distortion
pub const DISTORTION_MAX_AMOUNT: f32 = 50.0;
/// Number of points in a waveshaper transfer table
pub const CURVE_RESOLUTION: usize = 44_100;

/// One of the four per-stem chain controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Knob {
    Pregain,
    Compression,
    Tone,
    Distortion,
}

impl Knob {
    pub const ALL: [Knob; 4] = [Knob::Pregain, Knob::Compression, Knob::Tone, Knob::Distortion];

    pub fn name(&self) -> &'static str {
        match self {
            Knob::Pregain => "pregain",
            Knob::Compression => "compression",
            Knob::Tone => "tone",
            Knob::Distortion => "distortion",
        }
    }

    /// Value a knob returns to on reset
    pub fn default_value(&self) -> f32 {
        match self {
            Knob::Pregain => 0.3,
            Knob::Compression => 0.0,
            Knob::Tone => 0.7,
            Knob::Distortion => 0.0,
        }
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown knob: {0}")]
pub struct ParseKnobError(pub String);

impl FromStr for Knob {
    type Err = ParseKnobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Knob::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseKnobError(s.to_string()))
    }
}

/// Stored knob values of one stem
///
/// These are the user's settings. Bypass never writes here, which is what
/// lets leaving bypass restore the exact pre-bypass sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainParams {
    pub pregain: f32,
    pub compression: f32,
    pub tone: f32,
    pub distortion: f32,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            pregain: Knob::Pregain.default_value(),
            compression: Knob::Compression.default_value(),
            tone: Knob::Tone.default_value(),
            distortion: Knob::Distortion.default_value(),
        }
    }
}

impl ChainParams {
    pub fn get(&self, knob: Knob) -> f32 {
        match knob {
            Knob::Pregain => self.pregain,
            Knob::Compression => self.compression,
            Knob::Tone => self.tone,
            Knob::Distortion => self.distortion,
        }
    }

    /// Store a knob value, clamped to `[0, 1]`; returns the stored value
    pub fn set(&mut self, knob: Knob, value: f32) -> f32 {
        let value = clamp_unit(value);
        let slot = match knob {
            Knob::Pregain => &mut self.pregain,
            Knob::Compression => &mut self.compression,
            Knob::Tone => &mut self.tone,
            Knob::Distortion => &mut self.distortion,
        };
        *slot = value;
        value
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Threshold/ratio pair driving the compressor stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub ratio: f32,
}

impl CompressorSettings {
    /// Threshold at full scale and 1:1, which passes audio unchanged
    pub const NEUTRAL: CompressorSettings = CompressorSettings {
        threshold_db: 0.0,
        ratio: 1.0,
    };
}

pub fn pregain_gain(value: f32) -> f32 {
    PREGAIN_MIN + clamp_unit(value) * (PREGAIN_MAX - PREGAIN_MIN)
}

/// Lower threshold and higher ratio as the knob turns up
pub fn compressor_settings(value: f32) -> CompressorSettings {
    let value = clamp_unit(value);
    CompressorSettings {
        threshold_db: COMPRESSOR_FLOOR_DB * value,
        ratio: 1.0 + value * (COMPRESSOR_MAX_RATIO - 1.0),
    }
}

/// Exponential sweep so equal knob travel covers equal musical intervals
pub fn tone_cutoff_hz(value: f32) -> f32 {
    TONE_MIN_HZ * (TONE_MAX_HZ / TONE_MIN_HZ).powf(clamp_unit(value))
}

pub fn distortion_amount(value: f32) -> f32 {
    clamp_unit(value) * DISTORTION_MAX_AMOUNT
}

/// Sample `y = (1 + k)·x / (1 + k·|x|)` over `x ∈ [-1, 1]`
///
/// The curve is odd, monotonic, and bounded by `(1 + k) / k`. At `k = 0` it
/// is the identity.
pub fn distortion_curve(amount: f32, resolution: usize) -> Vec<f32> {
    let k = amount.max(0.0);
    let resolution = resolution.max(2);
    let last = (resolution - 1) as f32;
    (0..resolution)
        .map(|i| {
            let x = i as f32 * 2.0 / last - 1.0;
            (1.0 + k) * x / (1.0 + k * x.abs())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ChainParams::default();
        assert_eq!(params.pregain, 0.3);
        assert_eq!(params.compression, 0.0);
        assert_eq!(params.tone, 0.7);
        assert_eq!(params.distortion, 0.0);
    }

    #[test]
    fn test_set_clamps() {
        let mut params = ChainParams::default();
        assert_eq!(params.set(Knob::Tone, 1.7), 1.0);
        assert_eq!(params.set(Knob::Pregain, -3.0), 0.0);
        assert_eq!(params.set(Knob::Compression, f32::NAN), 0.0);
        assert_eq!(params.get(Knob::Tone), 1.0);
    }

    #[test]
    fn test_knob_parsing() {
        assert_eq!("Tone".parse::<Knob>(), Ok(Knob::Tone));
        assert_eq!(" distortion ".parse::<Knob>(), Ok(Knob::Distortion));
        assert!("reverb".parse::<Knob>().is_err());
    }

    #[test]
    fn test_pregain_range() {
        assert!((pregain_gain(0.0) - 0.2).abs() < 1e-6);
        assert!((pregain_gain(1.0) - 4.0).abs() < 1e-6);
        assert!((pregain_gain(0.5) - 2.1).abs() < 1e-6);
    }

    #[test]
    fn test_compressor_zero_is_neutral() {
        assert_eq!(compressor_settings(0.0), CompressorSettings::NEUTRAL);
        let full = compressor_settings(1.0);
        assert_eq!(full.ratio, COMPRESSOR_MAX_RATIO);
        assert_eq!(full.threshold_db, COMPRESSOR_FLOOR_DB);
    }

    #[test]
    fn test_compressor_monotonic() {
        let mut prev = compressor_settings(0.0);
        for step in 1..=20 {
            let next = compressor_settings(step as f32 / 20.0);
            assert!(next.threshold_db < prev.threshold_db);
            assert!(next.ratio > prev.ratio);
            prev = next;
        }
    }

    #[test]
    fn test_tone_sweep() {
        assert!((tone_cutoff_hz(0.0) - 300.0).abs() < 0.01);
        assert!((tone_cutoff_hz(1.0) - 10_000.0).abs() < 0.5);
        assert!(tone_cutoff_hz(0.4) < tone_cutoff_hz(0.6));
    }

    #[test]
    fn test_curve_shape() {
        let curve = distortion_curve(distortion_amount(0.5), CURVE_RESOLUTION);
        assert_eq!(curve.len(), CURVE_RESOLUTION);
        assert!(curve.windows(2).all(|w| w[1] >= w[0]));

        // Odd symmetry around the midpoint
        let n = curve.len();
        for i in [0, 100, 5000, 20000] {
            assert!((curve[i] + curve[n - 1 - i]).abs() < 1e-4);
        }
        assert!((curve[0] + 1.0).abs() < 1e-6);
        assert!((curve[n - 1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_curve_identity_at_zero() {
        let curve = distortion_curve(0.0, 5);
        assert_eq!(curve, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }
}
