//! Per-stem effects chain
//!
//! A stem's audio runs through an ordered list of stages:
//!
//! ```text
//! pregain → compressor → tone → [distortion] → stem gain
//! ```
//!
//! - [`params`] holds the user-facing knob values and the pure mapping from a
//!   knob position to a concrete DSP setting.
//! - [`native`] holds the DSP stages themselves.
//! - [`chain`] holds the stage list the audio thread runs ([`StemChain`]) and
//!   its control-side mirror ([`LiveChain`]).

pub mod chain;
pub mod native;
pub mod params;

pub use chain::{LiveChain, Stage, StageKind, StageUpdate, StemChain};
pub use params::{ChainParams, CompressorSettings, Knob, ParseKnobError};

use crate::types::StereoBuffer;

/// A stereo, zero-latency processing stage
///
/// Implementations run on the audio thread: `process` must not allocate,
/// lock, or block.
pub trait Effect: Send {
    /// Process a stereo buffer in place
    fn process(&mut self, buffer: &mut StereoBuffer);

    /// Clear internal state (filter memories, envelopes)
    fn reset(&mut self);
}
