//! Play/pause/seek state machine
//!
//! The transport only does time bookkeeping. It does not talk to the
//! engine; the session turns its transitions into engine commands.

/// Either paused with nothing running, or playing since a reference instant
///
/// Keeping `started_at` inside the `Playing` variant makes "playing without a
/// start time" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportState {
    Paused,
    Playing {
        /// Reference clock reading when playback last began
        started_at: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    /// Logical position in seconds; the start base while playing
    offset: f64,
    state: TransportState,
    max_duration: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            offset: 0.0,
            state: TransportState::Paused,
            max_duration: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, TransportState::Playing { .. })
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    /// Pause-equivalent teardown for a stem reload: clears offset and length
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set the timeline length after a (re)load
    pub fn set_max_duration(&mut self, seconds: f64) {
        self.max_duration = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.offset = self.clamp(self.offset);
    }

    fn clamp(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.max_duration)
    }

    /// Begin playing from `offset`; returns the offset sources start from
    pub fn start(&mut self, now: f64) -> f64 {
        self.state = TransportState::Playing { started_at: now };
        self.offset
    }

    /// Fold elapsed time into `offset` and stop
    ///
    /// Returns `false` (and changes nothing) when already paused.
    pub fn stop(&mut self, now: f64) -> bool {
        match self.state {
            TransportState::Playing { started_at } => {
                self.offset = self.clamp(self.offset + (now - started_at));
                self.state = TransportState::Paused;
                true
            }
            TransportState::Paused => false,
        }
    }

    /// Move the offset to `ratio · max_duration`, ratio clamped to `[0, 1]`
    ///
    /// Only the offset changes; restarting sources is the caller's job.
    pub fn seek(&mut self, ratio: f64, now: f64) -> f64 {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        self.offset = self.clamp(ratio * self.max_duration);
        if let TransportState::Playing { .. } = self.state {
            self.state = TransportState::Playing { started_at: now };
        }
        self.offset
    }

    /// Logical position at `now`, clamped to the timeline
    pub fn position(&self, now: f64) -> f64 {
        match self.state {
            TransportState::Playing { started_at } => self.clamp(self.offset + (now - started_at)),
            TransportState::Paused => self.offset,
        }
    }

    /// Position as a fraction of the timeline in `[0, 1]`
    pub fn progress(&self, now: f64) -> f64 {
        if self.max_duration <= 0.0 {
            return 0.0;
        }
        (self.position(now) / self.max_duration).clamp(0.0, 1.0)
    }
}
