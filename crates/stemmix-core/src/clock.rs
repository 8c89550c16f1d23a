//! Monotonic reference clocks for the transport
//!
//! The transport never reads wall time directly; it asks a [`Clock`]. With a
//! device running that is the [`AudioClock`], derived from frames the engine
//! has actually rendered, so cursor position and audible position cannot
//! drift apart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::EngineAtomics;

/// A monotonic time source, in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Time as rendered by the audio engine
#[derive(Debug, Clone)]
pub struct AudioClock {
    atomics: Arc<EngineAtomics>,
    sample_rate: u32,
}

impl AudioClock {
    pub fn new(atomics: Arc<EngineAtomics>, sample_rate: u32) -> Self {
        Self {
            atomics,
            sample_rate: sample_rate.max(1),
        }
    }
}

impl Clock for AudioClock {
    fn now(&self) -> f64 {
        self.atomics.frames_rendered() as f64 / self.sample_rate as f64
    }
}

/// Externally driven clock for deterministic hosts and tests
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let view = clock.clone();
        assert_eq!(view.now(), 0.0);

        clock.advance(1.5);
        clock.advance(0.25);
        assert_eq!(view.now(), 1.75);
    }

    #[test]
    fn test_audio_clock_follows_frames() {
        let atomics = Arc::new(EngineAtomics::new());
        let clock = AudioClock::new(Arc::clone(&atomics), 48000);

        atomics.frames_rendered.store(24000, Ordering::Relaxed);
        assert!((clock.now() - 0.5).abs() < 1e-12);
    }
}
