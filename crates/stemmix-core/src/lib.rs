//! Stemmix Core - multi-stem mixing and transport engine

pub mod audio;
pub mod audio_file;
pub mod clock;
pub mod config;
pub mod effect;
pub mod engine;
pub mod error;
pub mod session;
pub mod song;
pub mod types;
pub mod waveform;

pub use types::*;
