//! Per-stem aggregate owned by the session

use basedrop::{Owned, Shared};

use crate::audio_file::PcmBuffer;
use crate::effect::native::WaveShaper;
use crate::effect::params::{
    compressor_settings, distortion_amount, pregain_gain, tone_cutoff_hz, CompressorSettings,
    NEUTRAL_PREGAIN, TONE_OPEN_HZ,
};
use crate::effect::{ChainParams, Knob, LiveChain, StageUpdate};
use crate::engine::gc::gc_handle;
use crate::types::StemId;

/// One loaded stem: its audio, its knob state, and its mix settings
///
/// Every stem has exactly one of these and exactly one chain on the audio
/// thread, created together at load and dropped together at the next load.
pub struct StemTrack {
    pub(super) id: StemId,
    pub(super) name: String,
    pub(super) buffer: Shared<PcmBuffer>,
    pub(super) params: ChainParams,
    pub(super) volume: f32,
    pub(super) muted: bool,
    pub(super) bypassed: bool,
    pub(super) distortion_enabled: bool,
    pub(super) live: LiveChain,
}

impl StemTrack {
    pub(super) fn new(id: StemId, name: String, buffer: Shared<PcmBuffer>, distortion_enabled: bool) -> Self {
        Self {
            id,
            name,
            buffer,
            params: ChainParams::default(),
            volume: 1.0,
            muted: false,
            bypassed: false,
            distortion_enabled,
            live: LiveChain::default(),
        }
    }

    pub fn id(&self) -> StemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> &PcmBuffer {
        &self.buffer
    }

    pub(super) fn shared_buffer(&self) -> Shared<PcmBuffer> {
        Shared::clone(&self.buffer)
    }

    pub fn duration(&self) -> f64 {
        self.buffer.duration_seconds()
    }

    /// Stored knob values (untouched by bypass)
    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn distortion_enabled(&self) -> bool {
        self.distortion_enabled
    }

    /// Settings the audio thread is currently running for this stem
    pub fn live(&self) -> &LiveChain {
        &self.live
    }

    /// Output gain after mute
    pub fn effective_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Stage change that brings the live path in line with one knob
    ///
    /// Both `set_knob` and leaving bypass go through here, which is what
    /// makes restoring from bypass identical to setting the knobs directly.
    /// While bypassed, pregain/compressor/tone resolve to neutral. Distortion
    /// follows only `distortion_enabled && distortion > 0`; for a stem that
    /// cannot distort there is never an update.
    pub(super) fn knob_update(&self, knob: Knob) -> Option<StageUpdate> {
        let value = self.params.get(knob);
        match knob {
            Knob::Pregain => Some(StageUpdate::Pregain {
                gain: if self.bypassed {
                    NEUTRAL_PREGAIN
                } else {
                    pregain_gain(value)
                },
            }),
            Knob::Compression => Some(StageUpdate::Compressor(if self.bypassed {
                CompressorSettings::NEUTRAL
            } else {
                compressor_settings(value)
            })),
            Knob::Tone => Some(StageUpdate::Tone {
                cutoff_hz: if self.bypassed {
                    TONE_OPEN_HZ
                } else {
                    tone_cutoff_hz(value)
                },
            }),
            Knob::Distortion if !self.distortion_enabled => None,
            Knob::Distortion if value > 0.0 => {
                let shaper = WaveShaper::new(distortion_amount(value));
                Some(StageUpdate::InsertDistortion(Owned::new(&gc_handle(), shaper)))
            }
            Knob::Distortion => Some(StageUpdate::RemoveDistortion),
        }
    }

    pub(super) fn gain_update(&self) -> StageUpdate {
        StageUpdate::Gain {
            gain: self.effective_gain(),
        }
    }

    /// Updates that configure a fresh chain for this stem
    pub(super) fn initial_updates(&self) -> Vec<StageUpdate> {
        Knob::ALL
            .iter()
            .filter_map(|knob| self.knob_update(*knob))
            .chain(std::iter::once(self.gain_update()))
            .collect()
    }
}

impl std::fmt::Debug for StemTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemTrack")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("frames", &self.buffer.frames())
            .field("params", &self.params)
            .field("volume", &self.volume)
            .field("muted", &self.muted)
            .field("bypassed", &self.bypassed)
            .field("distortion_enabled", &self.distortion_enabled)
            .finish()
    }
}
