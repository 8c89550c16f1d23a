//! Playback cursor sampling
//!
//! The host calls [`CursorSampler::on_frame`] from its redraw loop. The
//! sampler is armed by play and disarmed by pause, so a redraw that runs
//! after pause returned yields nothing, and there is no separate timer that
//! could outlive the playback it reports on.

use super::transport::Transport;

#[derive(Debug, Clone, Default)]
pub struct CursorSampler {
    armed: bool,
}

impl CursorSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Stop sampling; takes effect before the next `on_frame`
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Sample the cursor as a 0–100 percentage
    ///
    /// Returns `None` once cancelled, and disarms itself if the transport is
    /// found paused. Never modifies the transport.
    pub fn on_frame(&mut self, transport: &Transport, now: f64) -> Option<f64> {
        if !self.armed {
            return None;
        }
        if !transport.is_playing() {
            self.armed = false;
            return None;
        }
        Some(transport.progress(now) * 100.0)
    }
}
