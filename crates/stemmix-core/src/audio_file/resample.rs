//! Sample rate conversion for decoded stems

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::{DecodeError, PcmBuffer};
use crate::types::Sample;

/// Input frames fed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

fn append(out: &mut [Vec<Sample>], block: Vec<Vec<Sample>>) {
    for (channel, samples) in out.iter_mut().zip(block) {
        channel.extend_from_slice(&samples);
    }
}

impl PcmBuffer {
    /// This buffer at `target_rate`
    ///
    /// The result is `round(frames * target / source)` frames long and lines
    /// up with the input in time: the resampler's delay is trimmed and its
    /// tail flushed. A buffer already at `target_rate` is returned as is.
    pub fn resampled(self, target_rate: u32) -> Result<PcmBuffer, DecodeError> {
        if target_rate == 0 {
            return Err(DecodeError::UnknownSampleRate);
        }
        if self.sample_rate == target_rate || self.frames() == 0 {
            return PcmBuffer::new(target_rate, self.channels);
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let frames = self.frames();
        let expected = (frames as f64 * ratio).round() as usize;
        let channel_count = self.channel_count();

        let mut resampler =
            SincFixedIn::<Sample>::new(ratio, 1.0, sinc_parameters(), CHUNK_FRAMES, channel_count)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
        let delay = resampler.output_delay();
        let failed = |e: rubato::ResampleError| DecodeError::Resample(e.to_string());

        let mut out = vec![Vec::with_capacity(expected + delay + CHUNK_FRAMES * 2); channel_count];
        let mut position = 0;
        while position + CHUNK_FRAMES <= frames {
            let block: Vec<&[Sample]> = self
                .channels
                .iter()
                .map(|c| &c[position..position + CHUNK_FRAMES])
                .collect();
            append(&mut out, resampler.process(&block, None).map_err(failed)?);
            position += CHUNK_FRAMES;
        }
        if position < frames {
            let rest: Vec<&[Sample]> = self.channels.iter().map(|c| &c[position..]).collect();
            append(&mut out, resampler.process_partial(Some(&rest), None).map_err(failed)?);
        }
        while out[0].len() < expected + delay {
            let tail = resampler
                .process_partial::<&[Sample]>(None, None)
                .map_err(failed)?;
            if tail.first().map_or(true, Vec::is_empty) {
                break;
            }
            append(&mut out, tail);
        }

        for channel in &mut out {
            channel.drain(..delay.min(channel.len()));
            channel.resize(expected, 0.0);
        }
        log::debug!(
            "Resampled {} frames at {}Hz to {} frames at {}Hz",
            frames,
            self.sample_rate,
            expected,
            target_rate
        );
        PcmBuffer::new(target_rate, out)
    }
}
