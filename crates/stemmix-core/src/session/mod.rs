//! Control-path session: stems, transport, mixer and cursor in one owner
//!
//! Every user-facing operation runs here, on one control thread. Operations
//! update session state synchronously and forward the audible part to the
//! audio thread as [`EngineCommand`]s; nothing here waits on the audio
//! thread.
//!
//! ```ignore
//! let mut session = Session::new(commands, clock, sample_rate, SessionConfig::default());
//! let report = session.load_song(&sources, &SymphoniaDecoder::new());
//! session.play()?;
//! // each redraw
//! if let Some(percent) = session.on_redraw() { draw_cursor(percent); }
//! ```

mod config;
mod cursor;
mod order;
mod stem;
mod transport;

pub use config::SessionConfig;
pub use cursor::CursorSampler;
pub use order::{compare_stems, sort_by_stem_order, stem_rank, CANONICAL_STEM_ORDER};
pub use stem::StemTrack;
pub use transport::{Transport, TransportState};

use std::collections::HashMap;

use basedrop::{Owned, Shared};

use crate::audio_file::{Decoder, EncodedStem, PcmBuffer};
use crate::clock::Clock;
use crate::effect::params::clamp_unit;
use crate::effect::{Knob, StemChain};
use crate::engine::gc::gc_handle;
use crate::engine::{CommandSender, EngineCommand, EngineStem};
use crate::error::{InvalidOperation, LoadError};
use crate::types::{StemId, MAX_STEMS};
use crate::waveform::{self, Peak};

/// What a knob change did to the signal path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnobOutcome {
    /// Stored and applied to the live chain
    Applied,
    /// Stored; the stem is bypassed so it goes live when bypass ends
    Deferred,
    /// Stored, but this stem has no distortion stage to drive
    Ignored,
}

/// A stem that was left out of a load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub name: String,
    pub error: LoadError,
}

/// Result of (re)loading a stem set
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Loaded stems in display order
    pub loaded: Vec<StemId>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Session<C: Clock> {
    commands: CommandSender,
    clock: C,
    sample_rate: u32,
    config: SessionConfig,
    tracks: HashMap<StemId, StemTrack>,
    /// Display order
    order: Vec<StemId>,
    transport: Transport,
    cursor: CursorSampler,
    cursor_percent: f64,
    master_volume: f32,
}

impl<C: Clock> Session<C> {
    /// Create a session driving the engine behind `commands`
    ///
    /// `sample_rate` is the engine's output rate; chains are built for it.
    pub fn new(commands: CommandSender, clock: C, sample_rate: u32, config: SessionConfig) -> Self {
        let master_volume = clamp_unit(config.master_volume);
        let mut session = Self {
            commands,
            clock,
            sample_rate,
            config,
            tracks: HashMap::new(),
            order: Vec::new(),
            transport: Transport::new(),
            cursor: CursorSampler::new(),
            cursor_percent: 0.0,
            master_volume,
        };
        session
            .commands
            .send(EngineCommand::SetMasterVolume(master_volume));
        session
    }

    // ─────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────

    /// Decode and load a song's stems, replacing the current set
    ///
    /// Stems that fail to decode are reported and skipped; the rest load.
    pub fn load_song<D: Decoder + ?Sized>(&mut self, sources: &[EncodedStem], decoder: &D) -> LoadReport {
        self.teardown();

        let mut decoded = Vec::with_capacity(sources.len());
        let mut failures = Vec::new();
        for source in sources {
            match decoder.decode(source) {
                Ok(pcm) => decoded.push((source.name.clone(), pcm)),
                Err(e) => {
                    log::warn!("Failed to decode stem '{}': {}", source.name, e);
                    failures.push(LoadFailure {
                        name: source.name.clone(),
                        error: e.into(),
                    });
                }
            }
        }

        self.install(decoded, failures)
    }

    /// Load already-decoded stems, replacing the current set
    pub fn load_decoded(&mut self, stems: Vec<(String, PcmBuffer)>) -> LoadReport {
        self.teardown();
        self.install(stems, Vec::new())
    }

    /// Stop everything and release the previous stem set
    fn teardown(&mut self) {
        if self.transport.is_playing() {
            self.commands.send(EngineCommand::Stop);
        }
        self.cursor.cancel();
        self.transport.reset();
        self.cursor_percent = 0.0;
        if !self.order.is_empty() {
            self.commands.send(EngineCommand::ClearStems);
        }
        self.tracks.clear();
        self.order.clear();
    }

    fn install(&mut self, stems: Vec<(String, PcmBuffer)>, mut failures: Vec<LoadFailure>) -> LoadReport {
        let handle = gc_handle();
        let mut accepted: Vec<StemTrack> = Vec::with_capacity(stems.len());

        for (name, pcm) in stems {
            let error = if accepted.iter().any(|t| t.name.eq_ignore_ascii_case(&name)) {
                Some(LoadError::DuplicateName)
            } else if accepted.len() >= MAX_STEMS {
                Some(LoadError::TooManyStems(MAX_STEMS))
            } else {
                None
            };
            if let Some(error) = error {
                log::warn!("Skipping stem '{}': {}", name, error);
                failures.push(LoadFailure { name, error });
                continue;
            }

            let source_rate = pcm.sample_rate();
            let pcm = match pcm.resampled(self.sample_rate) {
                Ok(pcm) => pcm,
                Err(e) => {
                    log::warn!("Cannot bring stem '{}' from {}Hz to {}Hz: {}", name, source_rate, self.sample_rate, e);
                    failures.push(LoadFailure { name, error: e.into() });
                    continue;
                }
            };

            let distortable = self.config.is_distortable(&name);
            accepted.push(StemTrack::new(
                StemId::next(),
                name,
                Shared::new(&handle, pcm),
                distortable,
            ));
        }

        sort_by_stem_order(&mut accepted, &self.config.stem_order, |t| t.name.as_str());

        let mut engine_stems = Vec::with_capacity(accepted.len());
        let mut max_duration: f64 = 0.0;
        for mut track in accepted {
            let mut chain = StemChain::new(self.sample_rate);
            for update in track.initial_updates() {
                track.live.apply(&update);
                chain.apply(update);
            }
            engine_stems.push(EngineStem::new(track.id, track.shared_buffer(), chain));

            max_duration = max_duration.max(track.duration());
            self.order.push(track.id);
            self.tracks.insert(track.id, track);
        }

        self.transport.set_max_duration(max_duration);
        self.commands
            .send(EngineCommand::LoadStems(Owned::new(&handle, engine_stems)));

        log::info!(
            "Loaded {} stems ({:.2}s), {} failed",
            self.order.len(),
            max_duration,
            failures.len()
        );

        LoadReport {
            loaded: self.order.clone(),
            failures,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────

    /// Start every stem from the current offset
    ///
    /// Already playing is a no-op.
    pub fn play(&mut self) -> Result<(), InvalidOperation> {
        if self.order.is_empty() {
            return Err(InvalidOperation::NoStemsLoaded);
        }
        if self.transport.max_duration() <= 0.0 {
            return Err(InvalidOperation::ZeroDuration);
        }
        if self.transport.is_playing() {
            return Ok(());
        }

        let now = self.clock.now();
        let offset = self.transport.start(now);
        self.commands.send(EngineCommand::Start {
            offset_seconds: offset,
        });
        self.cursor.arm();
        self.cursor_percent = self.transport.progress(now) * 100.0;

        log::debug!("Play from {:.3}s", offset);
        Ok(())
    }

    /// Stop every stem and keep the position
    ///
    /// Returns `false` if nothing was playing. The cursor is cancelled before
    /// this returns.
    pub fn pause(&mut self) -> bool {
        let now = self.clock.now();
        if !self.transport.stop(now) {
            return false;
        }
        self.commands.send(EngineCommand::Stop);
        self.cursor.cancel();
        self.cursor_percent = self.transport.progress(now) * 100.0;

        log::debug!("Pause at {:.3}s", self.transport.offset());
        true
    }

    pub fn toggle_play(&mut self) -> Result<(), InvalidOperation> {
        if self.transport.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jump to `ratio` of the timeline, clamped to `[0, 1]`
    ///
    /// While playing, sources are stopped and restarted at the new offset in
    /// the same quantum, so old and new positions never overlap.
    pub fn seek(&mut self, ratio: f64) {
        let now = self.clock.now();
        let playing = self.transport.is_playing();
        if playing {
            self.commands.send(EngineCommand::Stop);
        }
        let offset = self.transport.seek(ratio, now);
        if playing {
            self.commands.send(EngineCommand::Start {
                offset_seconds: offset,
            });
        }
        self.cursor_percent = self.transport.progress(now) * 100.0;

        log::debug!("Seek to {:.3}s", offset);
    }

    // ─────────────────────────────────────────────────────────────
    // Effects Chain
    // ─────────────────────────────────────────────────────────────

    /// Set a knob, clamped to `[0, 1]`, and update the live chain
    pub fn set_knob(&mut self, stem: StemId, knob: Knob, value: f32) -> Result<KnobOutcome, InvalidOperation> {
        let outcome = {
            let track = self
                .tracks
                .get_mut(&stem)
                .ok_or(InvalidOperation::UnknownStem(stem))?;
            track.params.set(knob, value);

            if knob == Knob::Distortion && !track.distortion_enabled {
                KnobOutcome::Ignored
            } else if knob != Knob::Distortion && track.bypassed {
                KnobOutcome::Deferred
            } else {
                KnobOutcome::Applied
            }
        };

        if outcome == KnobOutcome::Applied {
            self.apply_knob(stem, knob);
        }
        log::debug!("{} {} = {:.3} ({:?})", stem, knob, value, outcome);
        Ok(outcome)
    }

    /// Return one knob to its default value
    ///
    /// On a bypassed stem only the stored value changes; the stem stays
    /// neutral until bypass is turned off.
    pub fn reset_knob(&mut self, stem: StemId, knob: Knob) -> Result<KnobOutcome, InvalidOperation> {
        self.set_knob(stem, knob, knob.default_value())
    }

    /// Flip bypass; returns the new bypass state
    ///
    /// Entering bypass neutralizes pregain, compressor and tone on the live
    /// chain without touching stored values. Leaving re-applies all four
    /// knobs through the same path as [`Session::set_knob`].
    pub fn toggle_bypass(&mut self, stem: StemId) -> Result<bool, InvalidOperation> {
        let bypassed = {
            let track = self
                .tracks
                .get_mut(&stem)
                .ok_or(InvalidOperation::UnknownStem(stem))?;
            track.bypassed = !track.bypassed;
            track.bypassed
        };

        let knobs: &[Knob] = if bypassed {
            &[Knob::Pregain, Knob::Compression, Knob::Tone]
        } else {
            &Knob::ALL
        };
        for knob in knobs {
            self.apply_knob(stem, *knob);
        }

        log::debug!("{} bypass {}", stem, if bypassed { "on" } else { "off" });
        Ok(bypassed)
    }

    fn apply_knob(&mut self, stem: StemId, knob: Knob) {
        let Some(track) = self.tracks.get_mut(&stem) else {
            return;
        };
        if let Some(update) = track.knob_update(knob) {
            track.live.apply(&update);
            self.commands
                .send(EngineCommand::UpdateStage { stem, update });
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mixer
    // ─────────────────────────────────────────────────────────────

    pub fn set_global_volume(&mut self, volume: f32) {
        self.master_volume = clamp_unit(volume);
        self.commands
            .send(EngineCommand::SetMasterVolume(self.master_volume));
    }

    pub fn set_stem_volume(&mut self, stem: StemId, volume: f32) -> Result<(), InvalidOperation> {
        let track = self
            .tracks
            .get_mut(&stem)
            .ok_or(InvalidOperation::UnknownStem(stem))?;
        track.volume = clamp_unit(volume);
        self.apply_gain(stem);
        Ok(())
    }

    /// Flip mute; returns the new mute state
    pub fn toggle_mute(&mut self, stem: StemId) -> Result<bool, InvalidOperation> {
        let track = self
            .tracks
            .get_mut(&stem)
            .ok_or(InvalidOperation::UnknownStem(stem))?;
        track.muted = !track.muted;
        let muted = track.muted;
        self.apply_gain(stem);
        Ok(muted)
    }

    fn apply_gain(&mut self, stem: StemId) {
        let Some(track) = self.tracks.get_mut(&stem) else {
            return;
        };
        let update = track.gain_update();
        track.live.apply(&update);
        self.commands
            .send(EngineCommand::UpdateStage { stem, update });
    }

    // ─────────────────────────────────────────────────────────────
    // Cursor
    // ─────────────────────────────────────────────────────────────

    /// Call once per host redraw
    ///
    /// Returns the fresh cursor percentage while playing, `None` otherwise.
    /// Also retries any engine commands held back by a full queue.
    pub fn on_redraw(&mut self) -> Option<f64> {
        self.commands.flush();
        let percent = self.cursor.on_frame(&self.transport, self.clock.now())?;
        self.cursor_percent = percent;
        Some(percent)
    }

    // ─────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────

    /// Last sampled cursor position, 0–100
    pub fn cursor_percent(&self) -> f64 {
        self.cursor_percent
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Stored offset in seconds (the start base while playing)
    pub fn offset(&self) -> f64 {
        self.transport.offset()
    }

    /// Current logical position in seconds
    pub fn position(&self) -> f64 {
        self.transport.position(self.clock.now())
    }

    pub fn max_duration(&self) -> f64 {
        self.transport.max_duration()
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Loaded stems in display order
    pub fn stems(&self) -> impl Iterator<Item = &StemTrack> + '_ {
        self.order.iter().filter_map(|id| self.tracks.get(id))
    }

    pub fn stem(&self, id: StemId) -> Option<&StemTrack> {
        self.tracks.get(&id)
    }

    /// Look up a stem by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<StemId> {
        self.stems()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| t.id)
    }

    pub fn stem_id(&self, name: &str) -> Result<StemId, InvalidOperation> {
        self.find(name)
            .ok_or_else(|| InvalidOperation::UnknownStemName(name.to_string()))
    }

    /// Stems whose source is still running at the current position
    ///
    /// A stem shorter than the timeline drops out once the position passes
    /// its own length.
    pub fn active_sources(&self) -> Vec<StemId> {
        if !self.transport.is_playing() {
            return Vec::new();
        }
        let position = self.position();
        self.stems()
            .filter(|t| position < t.duration())
            .map(|t| t.id)
            .collect()
    }

    /// Min/max waveform columns for one stem
    pub fn waveform(&self, stem: StemId, width: usize) -> Result<Vec<Peak>, InvalidOperation> {
        let track = self
            .tracks
            .get(&stem)
            .ok_or(InvalidOperation::UnknownStem(stem))?;
        Ok(waveform::render(track.buffer(), width))
    }
}
