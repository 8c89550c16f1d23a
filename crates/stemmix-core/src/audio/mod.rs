//! Audio output for stemmix hosts
//!
//! A single stereo output through cpal. The audio thread owns the
//! [`AudioEngine`](crate::engine::AudioEngine); the control thread talks to
//! it through the returned [`CommandSender`](crate::engine::CommandSender)
//! and reads progress from [`EngineAtomics`](crate::engine::EngineAtomics).
//!
//! ```ignore
//! use stemmix_core::audio::{start_audio_system, AudioConfig};
//! use stemmix_core::clock::AudioClock;
//!
//! let system = start_audio_system(&AudioConfig::default())?;
//! let clock = AudioClock::new(system.atomics.clone(), system.sample_rate);
//! let session = Session::new(system.command_sender, clock, system.sample_rate, config);
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{AudioConfig, OutputTarget, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use cpal_backend::{start_audio_system, AudioHandle, AudioSystemResult};
pub use device::{list_output_devices, open_output, OutputDevice};
pub use error::{AudioError, AudioResult};
