//! Stage list of one stem
//!
//! The chain is a tagged list rather than a graph of connected nodes:
//! removing distortion deletes its list element, so the tone stage feeds the
//! gain stage directly and there is no connection to forget to undo.
//!
//! [`StemChain`] is owned by the audio thread and only changes through
//! [`StageUpdate`]s drained at the start of a processing quantum, so a
//! topology change always lands on a buffer boundary. [`LiveChain`] is the
//! control thread's copy of the same settings, kept in step by applying every
//! update to both.

use basedrop::Owned;

use super::native::{Compressor, GainStage, ToneFilter, WaveShaper};
use super::params::{CompressorSettings, NEUTRAL_PREGAIN, TONE_OPEN_HZ};
use super::Effect;
use crate::types::StereoBuffer;

/// Most stages a chain can hold; reserved up front so inserting distortion
/// never allocates on the audio thread
pub const MAX_STAGES: usize = 5;

/// Stage tags in signal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Pregain,
    Compressor,
    Tone,
    Distortion,
    Gain,
}

pub enum Stage {
    Pregain(GainStage),
    Compressor(Compressor),
    Tone(ToneFilter),
    /// Boxed through basedrop so replacing or removing it never frees the
    /// table on the audio thread
    Distortion(Owned<WaveShaper>),
    /// Stem volume, zero while muted
    Gain(GainStage),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Pregain(_) => StageKind::Pregain,
            Stage::Compressor(_) => StageKind::Compressor,
            Stage::Tone(_) => StageKind::Tone,
            Stage::Distortion(_) => StageKind::Distortion,
            Stage::Gain(_) => StageKind::Gain,
        }
    }

    fn effect_mut(&mut self) -> &mut dyn Effect {
        match self {
            Stage::Pregain(gain) | Stage::Gain(gain) => gain,
            Stage::Compressor(comp) => comp,
            Stage::Tone(tone) => tone,
            Stage::Distortion(shaper) => &mut **shaper,
        }
    }
}

/// A change to one stage of a chain
pub enum StageUpdate {
    Pregain { gain: f32 },
    Compressor(CompressorSettings),
    Tone { cutoff_hz: f32 },
    /// Insert the distortion stage before the gain stage, or replace the
    /// table of the one already there
    InsertDistortion(Owned<WaveShaper>),
    RemoveDistortion,
    /// Effective stem gain (`muted ? 0 : volume`)
    Gain { gain: f32 },
}

impl StageUpdate {
    pub fn kind(&self) -> StageKind {
        match self {
            StageUpdate::Pregain { .. } => StageKind::Pregain,
            StageUpdate::Compressor(_) => StageKind::Compressor,
            StageUpdate::Tone { .. } => StageKind::Tone,
            StageUpdate::InsertDistortion(_) | StageUpdate::RemoveDistortion => {
                StageKind::Distortion
            }
            StageUpdate::Gain { .. } => StageKind::Gain,
        }
    }
}

/// The audio-thread signal path of one stem
pub struct StemChain {
    stages: Vec<Stage>,
}

impl StemChain {
    /// Fresh chain with every stage at its neutral setting and no distortion
    pub fn new(sample_rate: u32) -> Self {
        let mut stages = Vec::with_capacity(MAX_STAGES);
        stages.push(Stage::Pregain(GainStage::new(NEUTRAL_PREGAIN)));
        stages.push(Stage::Compressor(Compressor::new(
            sample_rate,
            CompressorSettings::NEUTRAL,
        )));
        stages.push(Stage::Tone(ToneFilter::new(sample_rate, TONE_OPEN_HZ)));
        stages.push(Stage::Gain(GainStage::new(1.0)));
        Self { stages }
    }

    /// Apply a stage change (real-time safe)
    pub fn apply(&mut self, update: StageUpdate) {
        match update {
            StageUpdate::Pregain { gain } => {
                for stage in &mut self.stages {
                    if let Stage::Pregain(pregain) = stage {
                        pregain.set_gain(gain);
                    }
                }
            }
            StageUpdate::Compressor(settings) => {
                for stage in &mut self.stages {
                    if let Stage::Compressor(comp) = stage {
                        comp.set_settings(settings);
                    }
                }
            }
            StageUpdate::Tone { cutoff_hz } => {
                for stage in &mut self.stages {
                    if let Stage::Tone(tone) = stage {
                        tone.set_cutoff(cutoff_hz);
                    }
                }
            }
            StageUpdate::InsertDistortion(shaper) => {
                match self.position(StageKind::Distortion) {
                    // Old table is handed to the collector when dropped here
                    Some(index) => self.stages[index] = Stage::Distortion(shaper),
                    None => {
                        let index = self
                            .position(StageKind::Gain)
                            .unwrap_or(self.stages.len());
                        self.stages.insert(index, Stage::Distortion(shaper));
                    }
                }
            }
            StageUpdate::RemoveDistortion => {
                if let Some(index) = self.position(StageKind::Distortion) {
                    self.stages.remove(index);
                }
            }
            StageUpdate::Gain { gain } => {
                for stage in &mut self.stages {
                    if let Stage::Gain(out) = stage {
                        out.set_gain(gain);
                    }
                }
            }
        }
    }

    fn position(&self, kind: StageKind) -> Option<usize> {
        self.stages.iter().position(|s| s.kind() == kind)
    }

    pub fn has_distortion(&self) -> bool {
        self.position(StageKind::Distortion).is_some()
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn process(&mut self, buffer: &mut StereoBuffer) {
        for stage in &mut self.stages {
            stage.effect_mut().process(buffer);
        }
    }

    /// Clear filter and envelope state, e.g. before restarting at a new offset
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.effect_mut().reset();
        }
    }
}

/// Control-thread mirror of the settings a [`StemChain`] is running with
///
/// This is what the stem actually sounds like right now, as opposed to the
/// stored knob values which bypass leaves untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveChain {
    pub pregain: f32,
    pub compressor: CompressorSettings,
    pub tone_cutoff_hz: f32,
    /// Saturation amount when the distortion stage is in the path
    pub distortion: Option<f32>,
    pub gain: f32,
}

impl Default for LiveChain {
    fn default() -> Self {
        Self {
            pregain: NEUTRAL_PREGAIN,
            compressor: CompressorSettings::NEUTRAL,
            tone_cutoff_hz: TONE_OPEN_HZ,
            distortion: None,
            gain: 1.0,
        }
    }
}

impl LiveChain {
    pub fn apply(&mut self, update: &StageUpdate) {
        match update {
            StageUpdate::Pregain { gain } => self.pregain = *gain,
            StageUpdate::Compressor(settings) => self.compressor = *settings,
            StageUpdate::Tone { cutoff_hz } => self.tone_cutoff_hz = *cutoff_hz,
            StageUpdate::InsertDistortion(shaper) => self.distortion = Some(shaper.amount()),
            StageUpdate::RemoveDistortion => self.distortion = None,
            StageUpdate::Gain { gain } => self.gain = *gain,
        }
    }

    pub fn has_distortion(&self) -> bool {
        self.distortion.is_some()
    }

    /// Stage tags in signal order, same shape as [`StemChain::stage_kinds`]
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        let mut kinds = vec![StageKind::Pregain, StageKind::Compressor, StageKind::Tone];
        if self.has_distortion() {
            kinds.push(StageKind::Distortion);
        }
        kinds.push(StageKind::Gain);
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gc::gc_handle;
    use crate::types::StereoSample;

    fn shaper(amount: f32) -> StageUpdate {
        StageUpdate::InsertDistortion(Owned::new(&gc_handle(), WaveShaper::new(amount)))
    }

    #[test]
    fn test_new_chain_topology() {
        let chain = StemChain::new(48000);
        assert_eq!(
            chain.stage_kinds(),
            vec![
                StageKind::Pregain,
                StageKind::Compressor,
                StageKind::Tone,
                StageKind::Gain
            ]
        );
        assert!(!chain.has_distortion());
    }

    #[test]
    fn test_distortion_inserted_before_gain() {
        let mut chain = StemChain::new(48000);
        chain.apply(shaper(10.0));

        assert_eq!(
            chain.stage_kinds(),
            vec![
                StageKind::Pregain,
                StageKind::Compressor,
                StageKind::Tone,
                StageKind::Distortion,
                StageKind::Gain
            ]
        );
    }

    #[test]
    fn test_reinsert_replaces_instead_of_stacking() {
        let mut chain = StemChain::new(48000);
        chain.apply(shaper(10.0));
        chain.apply(shaper(40.0));

        let count = chain
            .stage_kinds()
            .into_iter()
            .filter(|k| *k == StageKind::Distortion)
            .count();
        assert_eq!(count, 1);

        match &chain.stages()[3] {
            Stage::Distortion(s) => assert_eq!(s.amount(), 40.0),
            _ => panic!("expected distortion at index 3"),
        }
    }

    #[test]
    fn test_remove_reconnects_tone_to_gain() {
        let mut chain = StemChain::new(48000);
        chain.apply(shaper(10.0));
        chain.apply(StageUpdate::RemoveDistortion);
        chain.apply(StageUpdate::RemoveDistortion);

        assert_eq!(chain.stage_kinds(), LiveChain::default().stage_kinds());
    }

    #[test]
    fn test_live_mirror_tracks_topology() {
        let mut chain = StemChain::new(48000);
        let mut live = LiveChain::default();

        for update in [shaper(25.0), StageUpdate::Gain { gain: 0.5 }] {
            live.apply(&update);
            chain.apply(update);
        }

        assert_eq!(live.stage_kinds(), chain.stage_kinds());
        assert_eq!(live.distortion, Some(25.0));
        assert_eq!(live.gain, 0.5);
    }

    #[test]
    fn test_neutral_chain_is_bit_exact() {
        let mut chain = StemChain::new(44100);
        let input = StereoBuffer::from_vec(
            (0..4800)
                .map(|i| StereoSample::new(((i * 7919) % 200) as f32 / 100.0 - 1.0, if i % 2 == 0 { 0.9 } else { -0.9 }))
                .collect(),
        );
        let mut buffer = input.clone();

        chain.process(&mut buffer);

        assert_eq!(buffer, input);
    }

    #[test]
    fn test_gain_update_mutes() {
        let mut chain = StemChain::new(48000);
        chain.apply(StageUpdate::Gain { gain: 0.0 });
        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::mono(0.9); 64]);

        chain.process(&mut buffer);

        assert_eq!(buffer.peak(), 0.0);
    }
}
