//! End-to-end session behaviour against a real engine
//!
//! The engine is driven directly instead of through a device. The session
//! clock is the engine's own frame counter, so transport time and rendered
//! audio advance together exactly as they do with cpal running.

use std::io::Cursor;

use stemmix_core::audio_file::{EncodedStem, PcmBuffer, SymphoniaDecoder};
use stemmix_core::clock::AudioClock;
use stemmix_core::effect::{Knob, LiveChain, Stage, StageKind};
use stemmix_core::engine::{command_channel, AudioEngine, EngineCommand};
use stemmix_core::error::{InvalidOperation, LoadError};
use stemmix_core::session::{KnobOutcome, Session, SessionConfig};
use stemmix_core::waveform::Peak;
use stemmix_core::StereoBuffer;

const SR: u32 = 1000;
const QUANTUM: usize = 100;

struct Rig {
    session: Session<AudioClock>,
    engine: AudioEngine,
    rx: rtrb::Consumer<EngineCommand>,
    out: StereoBuffer,
    rate: u32,
}

impl Rig {
    fn new() -> Self {
        Self::at_rate(SR)
    }

    /// Engine and session running at `rate`
    fn at_rate(rate: u32) -> Self {
        let engine = AudioEngine::new_with_sample_rate(rate);
        let (tx, rx) = command_channel(1024);
        let clock = AudioClock::new(engine.atomics(), rate);
        Self {
            session: Session::new(tx, clock, rate, SessionConfig::default()),
            engine,
            rx,
            out: StereoBuffer::silence(QUANTUM),
            rate,
        }
    }

    fn with_stems(stems: &[(&str, f64, f32)]) -> Self {
        let mut rig = Self::new();
        let decoded = stems
            .iter()
            .map(|(name, seconds, value)| {
                let frames = (seconds * SR as f64) as usize;
                (name.to_string(), PcmBuffer::mono(SR, vec![*value; frames]).unwrap())
            })
            .collect();
        let report = rig.session.load_decoded(decoded);
        assert!(report.is_complete());
        rig.quantum();
        rig
    }

    /// One audio callback
    fn quantum(&mut self) {
        self.out.set_len_from_capacity(QUANTUM);
        self.engine.process_commands(&mut self.rx);
        self.engine.process(&mut self.out);
    }

    fn run(&mut self, seconds: f64) {
        let quanta = (seconds * self.rate as f64 / QUANTUM as f64).round() as usize;
        for _ in 0..quanta {
            self.quantum();
        }
    }

    fn last_frame_level(&self) -> f32 {
        self.out[QUANTUM - 1].peak()
    }

    fn slot(&self, name: &str) -> usize {
        self.session
            .stems()
            .position(|t| t.name() == name)
            .unwrap()
    }

    /// What the engine is actually running for one stem, in mirror form
    fn engine_chain(&self, name: &str) -> LiveChain {
        let mut live = LiveChain::default();
        for stage in self.engine.stems()[self.slot(name)].chain().stages() {
            match stage {
                Stage::Pregain(g) => live.pregain = g.gain(),
                Stage::Compressor(c) => live.compressor = c.settings(),
                Stage::Tone(t) => live.tone_cutoff_hz = t.cutoff_hz(),
                Stage::Distortion(s) => live.distortion = Some(s.amount()),
                Stage::Gain(g) => live.gain = g.gain(),
            }
        }
        live
    }

    fn engine_stage_kinds(&self, name: &str) -> Vec<StageKind> {
        self.engine.stems()[self.slot(name)].chain().stage_kinds()
    }
}

fn wav_bytes(sample_rate: u32, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..frames * 2 {
            writer.write_sample(4096i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn pause_and_resume_keep_position() {
    let mut rig = Rig::with_stems(&[("drums", 10.0, 0.1)]);

    rig.session.play().unwrap();
    rig.run(2.0);
    assert!(rig.last_frame_level() > 0.0);

    assert!(rig.session.pause());
    assert!((rig.session.offset() - 2.0).abs() < 1e-9);

    // Device keeps running while paused; none of it counts
    rig.run(3.0);
    assert_eq!(rig.last_frame_level(), 0.0);
    assert!((rig.session.position() - 2.0).abs() < 1e-9);

    rig.session.play().unwrap();
    rig.run(1.5);
    assert!(rig.last_frame_level() > 0.0);
    assert!((rig.session.position() - 3.5).abs() < 1e-9);
}

#[test]
fn seek_clamps_and_cursor_follows() {
    let mut rig = Rig::with_stems(&[("drums", 12.0, 0.1)]);

    rig.session.seek(1.7);
    assert_eq!(rig.session.offset(), 12.0);
    assert_eq!(rig.session.cursor_percent(), 100.0);

    rig.session.seek(-0.3);
    assert_eq!(rig.session.offset(), 0.0);
    assert_eq!(rig.session.cursor_percent(), 0.0);

    rig.session.seek(0.25);
    assert_eq!(rig.session.offset(), 3.0);
    assert_eq!(rig.session.cursor_percent(), 25.0);
}

#[test]
fn seek_while_playing_moves_audio() {
    let mut rig = Rig::with_stems(&[("drums", 4.0, 0.1), ("bass", 8.0, 0.2)]);
    rig.session.play().unwrap();
    rig.run(1.0);

    // Past the end of the short stem; only the long one keeps sounding
    rig.session.seek(0.75);
    rig.quantum();

    let atomics = rig.engine.atomics();
    assert!(!atomics.is_source_active(rig.slot("drums")));
    assert!(atomics.is_source_active(rig.slot("bass")));
    assert!((rig.session.position() - 6.1).abs() < 1e-9);
}

#[test]
fn distortion_zero_always_removes_stage() {
    let mut rig = Rig::with_stems(&[("guitar", 2.0, 0.1), ("vocals", 2.0, 0.1)]);
    let guitar = rig.session.stem_id("guitar").unwrap();
    let vocals = rig.session.stem_id("vocals").unwrap();

    assert_eq!(rig.session.set_knob(guitar, Knob::Distortion, 0.6), Ok(KnobOutcome::Applied));
    rig.quantum();
    assert!(rig.engine_stage_kinds("guitar").contains(&StageKind::Distortion));

    rig.session.set_knob(guitar, Knob::Distortion, 0.0).unwrap();
    rig.quantum();
    assert!(!rig.engine_stage_kinds("guitar").contains(&StageKind::Distortion));

    // Zero again from an already clean chain
    rig.session.set_knob(guitar, Knob::Distortion, 0.0).unwrap();
    rig.quantum();
    assert_eq!(
        rig.engine_stage_kinds("guitar"),
        vec![StageKind::Pregain, StageKind::Compressor, StageKind::Tone, StageKind::Gain]
    );

    assert_eq!(rig.session.set_knob(vocals, Knob::Distortion, 0.9), Ok(KnobOutcome::Ignored));
    rig.quantum();
    assert!(!rig.engine_stage_kinds("vocals").contains(&StageKind::Distortion));
}

#[test]
fn bypass_round_trip_restores_everything() {
    let mut rig = Rig::with_stems(&[("piano", 2.0, 0.1)]);
    let piano = rig.session.stem_id("piano").unwrap();
    rig.session.set_knob(piano, Knob::Pregain, 0.8).unwrap();
    rig.session.set_knob(piano, Knob::Compression, 0.4).unwrap();
    rig.session.set_knob(piano, Knob::Tone, 0.1).unwrap();
    rig.session.set_knob(piano, Knob::Distortion, 0.3).unwrap();
    rig.quantum();

    let params = *rig.session.stem(piano).unwrap().params();
    let live = rig.engine_chain("piano");
    assert_eq!(live, *rig.session.stem(piano).unwrap().live());

    rig.session.toggle_bypass(piano).unwrap();
    rig.quantum();
    let bypassed = rig.engine_chain("piano");
    assert_ne!(bypassed, live);
    assert_eq!(bypassed, *rig.session.stem(piano).unwrap().live());

    rig.session.toggle_bypass(piano).unwrap();
    rig.quantum();
    assert_eq!(*rig.session.stem(piano).unwrap().params(), params);
    assert_eq!(rig.engine_chain("piano"), live);
}

#[test]
fn mute_and_volume_reach_engine() {
    let mut rig = Rig::with_stems(&[("bass", 4.0, 0.2)]);
    let bass = rig.session.stem_id("bass").unwrap();
    rig.session.play().unwrap();
    rig.run(0.5);
    let full = rig.last_frame_level();
    assert!(full > 0.0);

    rig.session.toggle_mute(bass).unwrap();
    rig.quantum();
    assert_eq!(rig.last_frame_level(), 0.0);

    rig.session.toggle_mute(bass).unwrap();
    rig.session.set_global_volume(0.5);
    rig.run(0.5);
    assert!((rig.last_frame_level() - full * 0.5).abs() < 1e-4);
}

#[test]
fn waveform_is_deterministic_and_flat_for_silence() {
    let mut rig = Rig::new();
    rig.session.load_decoded(vec![
        ("drums".to_string(), PcmBuffer::silent(SR, 2, 5000).unwrap()),
        (
            "bass".to_string(),
            PcmBuffer::mono(SR, (0..5000).map(|i| (i as f32 * 0.01).sin()).collect()).unwrap(),
        ),
    ]);
    let drums = rig.session.stem_id("drums").unwrap();
    let bass = rig.session.stem_id("bass").unwrap();

    let silent = rig.session.waveform(drums, 100).unwrap();
    assert_eq!(silent.len(), 100);
    assert!(silent.iter().all(|p| *p == Peak::SILENT));

    assert_eq!(
        rig.session.waveform(bass, 100).unwrap(),
        rig.session.waveform(bass, 100).unwrap()
    );
}

#[test]
fn three_stem_scenario() {
    let mut rig = Rig::with_stems(&[("drums", 10.0, 0.1), ("bass", 12.0, 0.1), ("vocals", 8.0, 0.1)]);
    assert_eq!(rig.session.max_duration(), 12.0);

    rig.session.play().unwrap();
    rig.run(9.0);
    rig.session.pause();
    assert!((rig.session.offset() - 9.0).abs() < 1e-9);

    rig.session.seek(1.0);
    assert_eq!(rig.session.offset(), 12.0);

    // At the very end every source is already exhausted
    rig.session.play().unwrap();
    rig.quantum();
    assert_eq!(rig.session.on_redraw(), Some(100.0));
    assert_eq!(rig.engine.atomics().active_mask(), 0);
    rig.session.pause();

    // Just before the end only the longest stem is still running
    rig.session.seek(11.5 / 12.0);
    rig.session.play().unwrap();
    rig.quantum();

    let atomics = rig.engine.atomics();
    assert!(atomics.is_source_active(rig.slot("bass")));
    assert!(!atomics.is_source_active(rig.slot("drums")));
    assert!(!atomics.is_source_active(rig.slot("vocals")));
    let bass = rig.session.stem_id("bass").unwrap();
    assert_eq!(rig.session.active_sources(), vec![bass]);

    let early = rig.session.on_redraw().unwrap();
    rig.run(0.3);
    let later = rig.session.on_redraw().unwrap();
    assert!(later > early && later < 100.0);

    rig.run(1.0);
    assert_eq!(rig.session.on_redraw(), Some(100.0));
    assert_eq!(atomics.active_mask(), 0);
}

#[test]
fn play_rejected_until_loaded() {
    let mut rig = Rig::new();
    assert_eq!(rig.session.play(), Err(InvalidOperation::NoStemsLoaded));
    assert_eq!(rig.session.cursor_percent(), 0.0);
    assert!(!rig.session.is_playing());
}

#[test]
fn partial_decode_failure_still_plays() {
    let mut rig = Rig::new();
    let sources = vec![
        EncodedStem::new("vocals", wav_bytes(SR, 2000)).with_extension("wav"),
        EncodedStem::new("drums", vec![0xde, 0xad, 0xbe, 0xef]),
    ];

    let report = rig.session.load_song(&sources, &SymphoniaDecoder::new());

    assert_eq!(report.loaded.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].name, "drums");
    assert!(matches!(report.failures[0].error, LoadError::Decode(_)));
    assert_eq!(rig.session.max_duration(), 2.0);

    rig.session.play().unwrap();
    rig.run(0.5);
    assert!(rig.last_frame_level() > 0.0);
}

#[test]
fn stems_at_another_rate_follow_the_transport() {
    // Engine at 200 Hz, stem decoded at 100 Hz: one quantum is half a second
    let mut rig = Rig::at_rate(200);
    let report = rig
        .session
        .load_decoded(vec![("bass".to_string(), PcmBuffer::mono(100, vec![0.2; 300]).unwrap())]);
    assert!(report.is_complete());
    let bass = report.loaded[0];
    rig.quantum();

    assert_eq!(rig.session.max_duration(), 3.0);
    assert_eq!(rig.session.stem(bass).unwrap().duration(), 3.0);

    rig.session.play().unwrap();
    rig.run(1.5);
    assert!((rig.session.position() - 1.5).abs() < 1e-9);
    assert!((rig.session.on_redraw().unwrap() - 50.0).abs() < 1e-6);
    assert_eq!(rig.session.active_sources(), vec![bass]);
    assert!(rig.engine.atomics().is_source_active(0));
    assert!(rig.last_frame_level() > 0.1);

    // Resuming picks up exactly where the engine stopped
    rig.session.pause();
    assert!((rig.session.offset() - 1.5).abs() < 1e-9);
    rig.session.play().unwrap();
    rig.run(1.0);
    assert!(rig.engine.atomics().is_source_active(0));
    assert!(rig.last_frame_level() > 0.1);

    rig.run(0.5);
    assert_eq!(rig.session.on_redraw(), Some(100.0));
    assert!(rig.session.active_sources().is_empty());

    rig.run(0.5);
    assert_eq!(rig.engine.atomics().active_mask(), 0);
    assert_eq!(rig.last_frame_level(), 0.0);
}
