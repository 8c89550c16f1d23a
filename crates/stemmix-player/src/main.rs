//! Stemmix Player - terminal stem mixer
//!
//! Opens the audio device, scans a song folder or library, loads the
//! selected song and hands control to a line-based command loop.
//!
//! ## Command line
//!
//! - `stemmix-player <dir>`: a song folder or a folder of songs
//! - `--song <id>`: pick a song from the library
//! - `--config <file>`: alternative settings file
//! - `--list-devices`: print output devices and exit

mod config;
mod library;
mod repl;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use stemmix_core::audio::{list_output_devices, start_audio_system};
use stemmix_core::clock::AudioClock;
use stemmix_core::session::Session;

use library::Library;
use repl::Player;

#[derive(Parser, Debug)]
#[command(author, version, about = "Play and mix song stems", long_about = None)]
struct Args {
    /// Song folder, or a library of song folders (defaults to the configured library)
    path: Option<PathBuf>,

    /// Song id to load from the library
    #[arg(long)]
    song: Option<String>,

    /// Settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG=debug for transport and knob traces
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if args.list_devices {
        for device in list_output_devices()? {
            println!(
                "{}  {}ch {:?}",
                device, device.max_channels, device.sample_rates
            );
        }
        return Ok(());
    }

    log::info!("stemmix-player starting up");

    // Build the pool before the stream exists so its first use is not inside
    // an audio callback
    let threads = std::thread::available_parallelism()
        .map(|n| n.get().min(4))
        .unwrap_or(2);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("rayon-stems-{}", i))
        .build_global()
        .context("Failed to initialize Rayon thread pool")?;
    log::info!("Rayon thread pool initialized with {} threads", threads);

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_player_config_path);
    let settings = config::load_config(&config_path);
    if !config_path.exists() {
        // Leave an editable copy of the defaults behind
        if let Err(e) = config::save_config(&settings, &config_path) {
            log::warn!("Could not write default settings: {:#}", e);
        }
    }

    let library_path = args.path.clone().unwrap_or_else(|| settings.library_path.clone());
    let mut library = Library::scan(&library_path)
        .with_context(|| format!("Failed to scan {:?}", library_path))?;
    if let Some(id) = &args.song {
        if !library.select(id) {
            anyhow::bail!("No song '{}' in {:?}", id, library_path);
        }
    }

    let system = start_audio_system(&settings.audio).context("Failed to start audio output")?;
    println!(
        "Audio: {} @ {}Hz, {} frames (~{:.1}ms)",
        system.handle.device_name(),
        system.sample_rate,
        system.buffer_size,
        system.latency_ms
    );

    let clock = AudioClock::new(system.atomics.clone(), system.sample_rate);
    let session = Session::new(
        system.command_sender,
        clock,
        system.sample_rate,
        settings.session.clone(),
    );

    let mut player = Player::new(session, library, settings.display.waveform_width);
    if let Err(e) = player.load_selected() {
        println!("Nothing loaded: {:#}", e);
    }
    player.run(Duration::from_millis(settings.display.redraw_ms.max(10)))?;

    // Stream stops when the handle drops
    drop(system.handle);
    log::info!("stemmix-player shut down");
    Ok(())
}
