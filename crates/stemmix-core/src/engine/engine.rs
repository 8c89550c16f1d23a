//! Audio-thread engine: stem sources, per-stem chains, master bus

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use basedrop::{Owned, Shared};
use rayon::prelude::*;

use super::command::EngineCommand;
use super::mixer::MasterBus;
use crate::audio_file::PcmBuffer;
use crate::effect::StemChain;
use crate::types::{StemId, StereoBuffer, StereoSample, MAX_BUFFER_SIZE, MAX_STEMS};

/// State the control thread reads without locking
///
/// Written by the audio thread once per quantum with relaxed stores. The
/// frame counter doubles as the transport's reference clock when a device
/// is running.
#[derive(Debug, Default)]
pub struct EngineAtomics {
    /// Output frames rendered since the engine was created
    pub frames_rendered: AtomicU64,
    /// Bit `i` set while stem slot `i` has a playing source
    pub active_sources: AtomicU64,
    /// Number of loaded stems
    pub stem_count: AtomicUsize,
}

impl EngineAtomics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn active_mask(&self) -> u64 {
        self.active_sources.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn stem_count(&self) -> usize {
        self.stem_count.load(Ordering::Relaxed)
    }

    /// Whether the stem loaded in `slot` is still producing audio
    #[inline]
    pub fn is_source_active(&self, slot: usize) -> bool {
        slot < MAX_STEMS && self.active_mask() & (1 << slot) != 0
    }
}

/// One stem as the audio thread sees it
///
/// Built on the control thread (including the pre-allocated scratch buffer)
/// and moved in with [`EngineCommand::LoadStems`].
pub struct EngineStem {
    id: StemId,
    buffer: Shared<PcmBuffer>,
    chain: StemChain,
    /// Next frame to read; `None` when no source is playing
    source: Option<usize>,
    scratch: StereoBuffer,
}

impl EngineStem {
    pub fn new(id: StemId, buffer: Shared<PcmBuffer>, chain: StemChain) -> Self {
        Self {
            id,
            buffer,
            chain,
            source: None,
            scratch: StereoBuffer::silence(MAX_BUFFER_SIZE),
        }
    }

    pub fn id(&self) -> StemId {
        self.id
    }

    pub fn chain(&self) -> &StemChain {
        &self.chain
    }

    pub fn is_playing(&self) -> bool {
        self.source.is_some()
    }

    /// Start the source at `offset_seconds`, clamped to this stem's length
    fn start(&mut self, offset_seconds: f64) {
        let frames = self.buffer.frames();
        let start = (offset_seconds.max(0.0) * self.buffer.sample_rate() as f64).round() as usize;
        let start = start.min(frames);
        self.chain.reset();
        // A source started at the very end has nothing to play and is finished
        self.source = (start < frames).then_some(start);
    }

    fn stop(&mut self) {
        self.source = None;
    }

    /// Render `len` frames through the chain into `scratch`
    fn render(&mut self, len: usize) {
        self.scratch.set_len_from_capacity(len);

        let Some(position) = self.source else {
            self.scratch.fill_silence();
            return;
        };

        let frames = self.buffer.frames();
        let available = (frames - position).min(len);
        {
            let out = self.scratch.as_mut_slice();
            for (i, frame) in out.iter_mut().enumerate().take(available) {
                *frame = self.buffer.frame(position + i);
            }
            for frame in out.iter_mut().skip(available) {
                *frame = StereoSample::silence();
            }
        }

        self.chain.process(&mut self.scratch);

        let next = position + available;
        self.source = (next < frames).then_some(next);
    }
}

/// The render engine
///
/// Owned exclusively by the audio thread. All control goes through
/// [`EngineCommand`]s; all reporting goes out through [`EngineAtomics`].
pub struct AudioEngine {
    sample_rate: u32,
    stems: Option<Owned<Vec<EngineStem>>>,
    master: MasterBus,
    atomics: Arc<EngineAtomics>,
}

impl AudioEngine {
    pub fn new_with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stems: None,
            master: MasterBus::new(),
            atomics: Arc::new(EngineAtomics::new()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Lock-free state for the control thread
    ///
    /// Call once during setup and keep the `Arc`.
    pub fn atomics(&self) -> Arc<EngineAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn master_volume(&self) -> f32 {
        self.master.volume()
    }

    pub fn stems(&self) -> &[EngineStem] {
        match &self.stems {
            Some(stems) => stems.as_slice(),
            None => &[],
        }
    }

    fn stems_mut(&mut self) -> &mut [EngineStem] {
        match &mut self.stems {
            Some(stems) => stems.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Drain and apply every pending command (real-time safe)
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<EngineCommand>) {
        while let Ok(cmd) = rx.pop() {
            self.handle_command(cmd);
        }
        self.publish();
    }

    pub fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::LoadStems(stems) => {
                // Previous set is dropped here and reclaimed by the collector
                self.stems = Some(stems);
            }
            EngineCommand::ClearStems => {
                self.stems = None;
            }
            EngineCommand::Start { offset_seconds } => {
                for stem in self.stems_mut() {
                    stem.start(offset_seconds);
                }
            }
            EngineCommand::Stop => {
                for stem in self.stems_mut() {
                    stem.stop();
                }
            }
            EngineCommand::UpdateStage { stem, update } => {
                if let Some(target) = self.stems_mut().iter_mut().find(|s| s.id == stem) {
                    target.chain.apply(update);
                }
            }
            EngineCommand::SetMasterVolume(volume) => {
                self.master.set_volume(volume);
            }
        }
    }

    /// Render one quantum into `out`
    ///
    /// `out.len()` is the quantum size and must not exceed `MAX_BUFFER_SIZE`.
    pub fn process(&mut self, out: &mut StereoBuffer) {
        debug_assert!(out.len() <= MAX_BUFFER_SIZE, "quantum larger than MAX_BUFFER_SIZE");
        let len = out.len().min(MAX_BUFFER_SIZE);
        out.set_len_from_capacity(len);

        let stems: &mut [EngineStem] = match &mut self.stems {
            Some(stems) => stems.as_mut_slice(),
            None => &mut [],
        };

        stems.par_iter_mut().for_each(|stem| stem.render(len));

        // Stems that finished mid-quantum still carry their last frames
        self.master.mix(stems.iter().map(|s| &s.scratch), out);

        self.atomics
            .frames_rendered
            .fetch_add(len as u64, Ordering::Relaxed);
        self.publish();
    }

    fn publish(&self) {
        let mut mask = 0u64;
        for (slot, stem) in self.stems().iter().enumerate().take(MAX_STEMS) {
            if stem.is_playing() {
                mask |= 1 << slot;
            }
        }
        self.atomics.active_sources.store(mask, Ordering::Relaxed);
        self.atomics
            .stem_count
            .store(self.stems().len(), Ordering::Relaxed);
    }
}
