//! Deferred freeing for memory the audio thread lets go of
//!
//! Decoded stems are held in `Shared<PcmBuffer>` and waveshaper tables in
//! `Owned<WaveShaper>`. When the engine drops one, basedrop only queues the
//! pointer; the "audio-gc" thread does the actual free.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let pcm = Shared::new(&gc_handle(), decoded);
//! let for_engine = Shared::clone(&pcm);
//! ```

use std::sync::{mpsc, OnceLock};
use std::thread;
use std::time::Duration;

use basedrop::{Collector, Handle};

const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Start the collector thread and hand back a handle to it
///
/// `Collector` is `!Sync`, so it is built on the thread that drives it and
/// only the handle crosses back.
fn spawn_collector() -> Handle {
    let (handle_tx, handle_rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            let mut collector = Collector::new();
            handle_tx
                .send(collector.handle())
                .expect("GC handle receiver dropped");
            log::info!("Audio GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn audio GC thread");

    handle_rx.recv().expect("Audio GC thread exited before sending its handle")
}

/// Handle for allocating `Shared<T>`/`Owned<T>`; starts the collector on first use
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(spawn_collector).clone()
}
