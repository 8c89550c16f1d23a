//! Native Rust stages
//!
//! All stages are stereo and have zero latency, so swapping one in or out of
//! a chain never shifts a stem against the others.

mod compressor;
mod gain;
mod tone;
mod waveshaper;

pub use compressor::Compressor;
pub use gain::GainStage;
pub use tone::ToneFilter;
pub use waveshaper::WaveShaper;
