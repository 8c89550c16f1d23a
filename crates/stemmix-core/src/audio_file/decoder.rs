//! Symphonia-backed decoder

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{DecodeError, Decoder, EncodedStem, PcmBuffer};

/// Decodes any container/codec pair enabled in symphonia's default registry
///
/// Packets that fail to decode are logged and skipped, matching how a player
/// would ride over a corrupt frame. Failing to probe or finding no audio at
/// all is a hard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, stem: &EncodedStem) -> Result<PcmBuffer, DecodeError> {
        let source = Cursor::new(stem.bytes.clone());
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = stem.extension.as_deref() {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channel_count = track.codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut interleaved: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    log::warn!("[{}] Error reading packet: {}", stem.name, e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("[{}] Error decoding packet: {}", stem.name, e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channel_count.get_or_insert(spec.channels.count());

            let needed = decoded.capacity() * spec.channels.count();
            if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
        }

        let sample_rate = sample_rate.ok_or(DecodeError::UnknownSampleRate)?;
        let channel_count = channel_count.unwrap_or(2);

        if interleaved.len() < channel_count {
            return Err(DecodeError::Empty);
        }

        let pcm = PcmBuffer::from_interleaved(sample_rate, channel_count, &interleaved)?;
        log::debug!(
            "[{}] Decoded {} frames, {} channels @ {}Hz",
            stem.name,
            pcm.frames(),
            pcm.channel_count(),
            pcm.sample_rate()
        );
        Ok(pcm)
    }
}
