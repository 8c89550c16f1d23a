//! cpal output stream driving the engine
//!
//! ```text
//! ┌──────────────────┐   EngineCommand   ┌─────────────────────┐
//! │  Control Thread  │──────push()──────►│   Command Queue     │
//! │    (Session)     │                   │  (lock-free SPSC)   │
//! └────────┬─────────┘                   └──────────┬──────────┘
//!          │ relaxed loads                          │ pop()
//!          ▼                                        ▼
//! ┌──────────────────┐                   ┌─────────────────────┐
//! │  EngineAtomics   │◄──────stores──────│  cpal Audio Thread  │
//! │                  │                   │  (owns AudioEngine) │
//! └──────────────────┘                   └─────────────────────┘
//! ```
//!
//! The callback owns the engine outright. Nothing on the audio thread takes
//! a lock, allocates or frees.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};

use super::config::AudioConfig;
use super::device::open_output;
use super::error::{AudioError, AudioResult};
use crate::engine::{command_channel, AudioEngine, CommandSender, EngineAtomics, EngineCommand, COMMAND_QUEUE_CAPACITY};
use crate::types::{StereoBuffer, MAX_BUFFER_SIZE};

/// Keeps the output stream alive; drop it to stop audio
pub struct AudioHandle {
    _stream: Stream,
    device_name: String,
}

impl AudioHandle {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Everything a host needs once the device is running
pub struct AudioSystemResult {
    pub handle: AudioHandle,
    /// Control-side end of the engine's command queue
    pub command_sender: CommandSender,
    /// Engine state readable without locks; also the transport's clock source
    pub atomics: Arc<EngineAtomics>,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub latency_ms: f32,
}

/// Open the output device and start rendering
///
/// The engine runs at whatever rate the device settles on.
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    let device = open_output(config.device.as_ref())?;
    let device_name = device.name().unwrap_or_else(|_| String::from("(unnamed)"));

    let stream_config = choose_stream_config(&device, &device_name, config)?;
    let sample_rate = stream_config.sample_rate.0;
    let buffer_size = config.callback_frames();
    let latency_ms = 1000.0 * buffer_size as f32 / sample_rate as f32;
    log::info!(
        "Opening {}: {} ch @ {}Hz, {} frame callbacks ({:.1}ms)",
        device_name,
        stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    let engine = AudioEngine::new_with_sample_rate(sample_rate);
    let atomics = engine.atomics();
    let (command_sender, command_rx) = command_channel(COMMAND_QUEUE_CAPACITY);

    let stream = build_output_stream(&device, &stream_config, engine, command_rx)?;
    stream.play()?;

    Ok(AudioSystemResult {
        handle: AudioHandle { _stream: stream, device_name },
        command_sender,
        atomics,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// Prefer stereo-or-wider f32 at the requested rate, then any f32 layout
fn choose_stream_config(
    device: &cpal::Device,
    device_name: &str,
    config: &AudioConfig,
) -> AudioResult<StreamConfig> {
    let target = config.target_rate();
    let float_ranges: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()?
        .filter(|range| range.sample_format() == SampleFormat::F32)
        .collect();

    let runs_at_target =
        |range: &SupportedStreamConfigRange| range.min_sample_rate().0 <= target && target <= range.max_sample_rate().0;
    let rank = |range: &SupportedStreamConfigRange| (range.channels() >= 2, runs_at_target(range));

    let chosen = float_ranges
        .iter()
        .max_by_key(|range| rank(range))
        .ok_or_else(|| AudioError::NoFloatOutput(device_name.to_string()))?;

    let rate = if runs_at_target(chosen) {
        SampleRate(target)
    } else {
        log::warn!(
            "{} cannot run at {}Hz, using {}Hz; stems are resampled to match",
            device_name,
            target,
            chosen.max_sample_rate().0
        );
        chosen.max_sample_rate()
    };

    Ok(StreamConfig {
        channels: chosen.channels(),
        sample_rate: rate,
        buffer_size: cpal::BufferSize::Fixed(config.callback_frames()),
    })
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut engine: AudioEngine,
    mut command_rx: rtrb::Consumer<EngineCommand>,
) -> AudioResult<Stream> {
    let channels = usize::from(config.channels);
    let mut mix = StereoBuffer::silence(MAX_BUFFER_SIZE);

    let stream = device.build_output_stream(
        config,
        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
            // The host may ask for more than one pre-allocated quantum
            for block in out.chunks_mut(MAX_BUFFER_SIZE * channels) {
                mix.set_len_from_capacity(block.len() / channels);
                engine.process_commands(&mut command_rx);
                engine.process(&mut mix);

                if channels == 2 {
                    block.copy_from_slice(mix.as_interleaved());
                    continue;
                }
                for (device_frame, frame) in block.chunks_mut(channels).zip(mix.iter()) {
                    device_frame.fill(0.0);
                    match device_frame {
                        [mono] => *mono = 0.5 * (frame.left + frame.right),
                        [l, r, ..] => {
                            *l = frame.left;
                            *r = frame.right;
                        }
                        [] => {}
                    }
                }
            }
        },
        |err| log::error!("Output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
