//! Decoded stem audio and the decoder contract
//!
//! A stem arrives as `{name, bytes}` from whatever supplies the song and
//! leaves this module as a [`PcmBuffer`]: immutable, per-channel `f32` PCM at
//! the file's native sample rate. [`PcmBuffer::resampled`] brings it to the
//! output rate before the engine sees it.

mod decoder;
mod resample;

pub use decoder::SymphoniaDecoder;

use std::sync::Arc;

use thiserror::Error;

use crate::types::{Sample, StereoSample};

/// Errors produced while decoding a stem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Container or codec not recognised
    #[error("Unsupported audio format: {0}")]
    Unsupported(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Stream does not report a sample rate")]
    UnknownSampleRate,

    /// Decoding finished without producing a single frame
    #[error("Stream contains no audio frames")]
    Empty,

    /// Channel data handed to [`PcmBuffer::new`] was inconsistent
    #[error("Invalid PCM layout: {0}")]
    InvalidLayout(String),

    #[error("Sample rate conversion failed: {0}")]
    Resample(String),
}

/// Encoded stem bytes as supplied by the song source
#[derive(Debug, Clone)]
pub struct EncodedStem {
    /// Stem name, e.g. "drums"
    pub name: String,
    pub bytes: Arc<[u8]>,
    /// File extension used as a probe hint ("flac", "wav", ...)
    pub extension: Option<String>,
}

impl EncodedStem {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            extension: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// Turns encoded bytes into PCM
///
/// Implementations must report the channel count and sample rate of what they
/// decode. Any failure is returned as a [`DecodeError`] and only affects the
/// one stem.
pub trait Decoder {
    fn decode(&self, stem: &EncodedStem) -> Result<PcmBuffer, DecodeError>;
}

/// Decoded, immutable PCM audio
///
/// One `Vec` per channel, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<Sample>>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<Sample>>) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::UnknownSampleRate);
        }
        if channels.is_empty() {
            return Err(DecodeError::InvalidLayout("no channels".to_string()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(DecodeError::InvalidLayout(
                "channels differ in length".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Convenience constructor for a single channel
    pub fn mono(sample_rate: u32, samples: Vec<Sample>) -> Result<Self, DecodeError> {
        Self::new(sample_rate, vec![samples])
    }

    /// Silent buffer of the given length, mostly useful in tests and hosts
    pub fn silent(sample_rate: u32, channel_count: usize, frames: usize) -> Result<Self, DecodeError> {
        Self::new(sample_rate, vec![vec![0.0; frames]; channel_count.max(1)])
    }

    /// De-interleave `[c0, c1, .., c0, c1, ..]` into a buffer
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: usize,
        interleaved: &[Sample],
    ) -> Result<Self, DecodeError> {
        if channel_count == 0 {
            return Err(DecodeError::InvalidLayout("no channels".to_string()));
        }
        let frames = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames (samples per channel)
    #[inline]
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[Sample]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// Stereo frame at `index`; mono sources are duplicated to both sides and
    /// channels past the second are ignored.
    #[inline]
    pub fn frame(&self, index: usize) -> StereoSample {
        let left = self.channels[0][index];
        match self.channels.get(1) {
            Some(right) => StereoSample::new(left, right[index]),
            None => StereoSample::mono(left),
        }
    }
}
