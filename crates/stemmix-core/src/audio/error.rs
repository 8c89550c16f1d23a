//! Output device errors
//!
//! Fatal to playback and handed straight to the host; the session never
//! sees them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output devices available")]
    NoDevices,

    #[error("the default host has no output device")]
    NoDefaultDevice,

    #[error("output device {0} not found")]
    DeviceNotFound(String),

    #[error("listing output devices failed: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("querying stream configurations failed: {0}")]
    StreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    /// Nothing on the device takes 32-bit float frames
    #[error("{0} has no f32 output configuration")]
    NoFloatOutput(String),

    #[error("building the output stream failed: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("starting the output stream failed: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub type AudioResult<T> = Result<T, AudioError>;
