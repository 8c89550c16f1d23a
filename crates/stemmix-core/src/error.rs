//! Session error types
//!
//! Out-of-range knob, volume and seek values are clamped and never show up
//! here. Device failures have their own type in [`crate::audio::AudioError`].

use thiserror::Error;

use crate::audio_file::DecodeError;
use crate::types::StemId;

/// An operation that was rejected without changing any state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("No stems loaded")]
    NoStemsLoaded,

    #[error("Loaded stems have zero duration")]
    ZeroDuration,

    #[error("Unknown stem: {0}")]
    UnknownStem(StemId),

    #[error("Unknown stem name: {0}")]
    UnknownStemName(String),
}

/// Why a single stem was left out of a load
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Another stem with the same name was already accepted in this load
    #[error("Duplicate stem name")]
    DuplicateName,

    #[error("Too many stems (limit {0})")]
    TooManyStems(usize),

    /// The song source could not supply the stem's bytes
    #[error("Stem source unavailable: {0}")]
    Unavailable(String),
}
