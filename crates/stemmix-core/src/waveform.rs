//! Min/max waveform decimation
//!
//! Reduces a stem's PCM to one `(min, max)` pair per visual column. The
//! result depends only on the buffer and the width, so callers can cache it
//! per stem and redraw freely.
//!
//! Stereo sources are folded to mono by averaging the first two channels;
//! any further channels are not drawn.

use crate::audio_file::PcmBuffer;

/// Extremes of one column, in sample units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

impl Peak {
    pub const SILENT: Peak = Peak { min: 0.0, max: 0.0 };

    /// Pixel rows covered by this column in a lane `height` pixels tall
    ///
    /// Amplitude +1 maps to row 0 and -1 to row `height`. Returns
    /// `(top, thickness)`; thickness is at least 1 so flat stretches still
    /// draw a line.
    pub fn pixel_span(&self, height: f32) -> (f32, f32) {
        let mid = height / 2.0;
        let top = mid - self.max.clamp(-1.0, 1.0) * mid;
        let bottom = mid - self.min.clamp(-1.0, 1.0) * mid;
        (top, (bottom - top).max(1.0))
    }
}

/// Decimate `buffer` into `width` columns
///
/// Each column covers `max(1, frames / width)` consecutive frames starting at
/// `column * samples_per_pixel`. Columns that fall past the end of the audio
/// are silent. `width == 0` yields no columns.
pub fn render(buffer: &PcmBuffer, width: usize) -> Vec<Peak> {
    if width == 0 {
        return Vec::new();
    }

    let frames = buffer.frames();
    let samples_per_pixel = (frames / width).max(1);

    (0..width)
        .map(|col| {
            let start = col * samples_per_pixel;
            let end = (start + samples_per_pixel).min(frames);
            if start >= end {
                return Peak::SILENT;
            }

            let mut min = f32::INFINITY;
            let mut max = f32::NEG_INFINITY;
            for i in start..end {
                let frame = buffer.frame(i);
                let sample = (frame.left + frame.right) / 2.0;
                min = min.min(sample);
                max = max.max(sample);
            }
            Peak { min, max }
        })
        .collect()
}
