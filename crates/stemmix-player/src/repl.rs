//! Line-oriented control surface
//!
//! Everything runs on one control thread. A reader thread forwards stdin
//! lines over a channel; the control loop multiplexes those with a redraw
//! tick, so user commands and cursor sampling never run concurrently.

use std::io::BufRead;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::{self, Receiver};
use stemmix_core::audio_file::SymphoniaDecoder;
use stemmix_core::clock::Clock;
use stemmix_core::effect::Knob;
use stemmix_core::session::{KnobOutcome, LoadReport, Session};
use stemmix_core::waveform::Peak;

use crate::library::{Library, SongStems};

const HELP: &str = "\
commands:
  play | pause | toggle          transport
  seek <0..1 | N%>               jump within the song
  knob <stem> <knob> <0..1>      pregain | compression | tone | distortion
  reset <stem> <knob>            knob back to its default
  bypass <stem> | mute <stem>    toggles
  vol <stem> <0..1>              stem volume
  master <0..1>                  master volume
  wave <stem> [width]            text waveform
  songs | load <song-id>         library
  stems | status | help | quit";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    Seek(f64),
    Knob { stem: String, knob: Knob, value: f32 },
    Reset { stem: String, knob: Knob },
    Bypass(String),
    Mute(String),
    Volume { stem: String, value: f32 },
    Master(f32),
    Wave { stem: String, width: Option<usize> },
    Songs,
    Load(String),
    Stems,
    Status,
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T, String> {
    let word = word.ok_or_else(|| format!("missing {what}"))?;
    word.parse().map_err(|_| format!("bad {what}: {word}"))
}

fn word(word: Option<&str>, what: &str) -> Result<String, String> {
    word.map(str::to_string).ok_or_else(|| format!("missing {what}"))
}

fn knob(word: Option<&str>) -> Result<Knob, String> {
    let word = word.ok_or("missing knob")?;
    word.parse().map_err(|e| format!("{e}"))
}

/// `0.25` or `25%`
fn seek_ratio(word: Option<&str>) -> Result<f64, String> {
    match word {
        Some(w) if w.ends_with('%') => number::<f64>(Some(w.trim_end_matches('%')), "position").map(|p| p / 100.0),
        other => number(other, "position"),
    }
}

impl Command {
    /// `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "toggle" | "t" => Command::Toggle,
            "seek" => Command::Seek(seek_ratio(words.next())?),
            "knob" => Command::Knob {
                stem: word(words.next(), "stem")?,
                knob: knob(words.next())?,
                value: number(words.next(), "value")?,
            },
            "reset" => Command::Reset {
                stem: word(words.next(), "stem")?,
                knob: knob(words.next())?,
            },
            "bypass" => Command::Bypass(word(words.next(), "stem")?),
            "mute" => Command::Mute(word(words.next(), "stem")?),
            "vol" | "volume" => Command::Volume {
                stem: word(words.next(), "stem")?,
                value: number(words.next(), "volume")?,
            },
            "master" => Command::Master(number(words.next(), "volume")?),
            "wave" => Command::Wave {
                stem: word(words.next(), "stem")?,
                width: words.next().map(|w| number(Some(w), "width")).transpose()?,
            },
            "songs" => Command::Songs,
            "load" => Command::Load(word(words.next(), "song id")?),
            "stems" => Command::Stems,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command: {other} (try 'help')")),
        };
        Ok(Some(command))
    }
}

/// Session plus everything the text surface needs around it
pub struct Player<C: Clock> {
    session: Session<C>,
    library: Library,
    waveform_width: usize,
    last_cursor: Option<u32>,
}

impl<C: Clock> Player<C> {
    pub fn new(session: Session<C>, library: Library, waveform_width: usize) -> Self {
        Self {
            session,
            library,
            waveform_width,
            last_cursor: None,
        }
    }

    /// Load whatever song the library has selected
    ///
    /// Stems whose files could not be read are reported alongside those that
    /// failed to decode.
    pub fn load_selected(&mut self) -> Result<LoadReport> {
        let SongStems { song, stems, unreadable } = self.library.selected_stems()?;
        println!(
            "Loading '{}' ({} stems)",
            song.original_name,
            stems.len() + unreadable.len()
        );
        let mut report = self.session.load_song(&stems, &SymphoniaDecoder::new());
        report.failures.extend(unreadable);
        self.print_report(&report);
        self.last_cursor = None;
        Ok(report)
    }

    fn print_report(&self, report: &LoadReport) {
        for failure in &report.failures {
            println!("  ! {}: {}", failure.name, failure.error);
        }
        println!(
            "  {} stems ready, {:.1}s",
            report.loaded.len(),
            self.session.max_duration()
        );
    }

    /// Run until `quit` or end of input
    pub fn run(&mut self, redraw: Duration) -> Result<()> {
        let input = spawn_stdin_reader();
        let ticker = channel::tick(redraw);
        println!("{HELP}");

        loop {
            crossbeam::select! {
                recv(input) -> line => {
                    let Ok(line) = line else {
                        log::info!("Input closed");
                        break;
                    };
                    match Command::parse(&line) {
                        Ok(Some(Command::Quit)) => break,
                        Ok(Some(command)) => {
                            if let Err(e) = self.execute(command) {
                                println!("error: {e:#}");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => println!("{e}"),
                    }
                }
                recv(ticker) -> _ => self.redraw(),
            }
        }

        self.session.pause();
        Ok(())
    }

    fn redraw(&mut self) {
        let Some(percent) = self.session.on_redraw() else {
            return;
        };
        let whole = percent.floor() as u32;
        if self.last_cursor != Some(whole) {
            self.last_cursor = Some(whole);
            println!("{}", progress_bar(percent, 40));
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Play => self.session.play()?,
            Command::Pause => {
                self.session.pause();
                self.print_status();
            }
            Command::Toggle => self.session.toggle_play()?,
            Command::Seek(ratio) => {
                self.session.seek(ratio);
                self.print_status();
            }
            Command::Knob { stem, knob, value } => {
                let id = self.session.stem_id(&stem)?;
                match self.session.set_knob(id, knob, value)? {
                    KnobOutcome::Applied => {}
                    KnobOutcome::Deferred => println!("{stem} is bypassed; {knob} applies when bypass ends"),
                    KnobOutcome::Ignored => println!("{stem} has no distortion stage"),
                }
            }
            Command::Reset { stem, knob } => {
                let id = self.session.stem_id(&stem)?;
                self.session.reset_knob(id, knob)?;
            }
            Command::Bypass(stem) => {
                let id = self.session.stem_id(&stem)?;
                let on = self.session.toggle_bypass(id)?;
                println!("{stem} bypass {}", if on { "on" } else { "off" });
            }
            Command::Mute(stem) => {
                let id = self.session.stem_id(&stem)?;
                let on = self.session.toggle_mute(id)?;
                println!("{stem} {}", if on { "muted" } else { "unmuted" });
            }
            Command::Volume { stem, value } => {
                let id = self.session.stem_id(&stem)?;
                self.session.set_stem_volume(id, value)?;
            }
            Command::Master(value) => self.session.set_global_volume(value),
            Command::Wave { stem, width } => {
                let id = self.session.stem_id(&stem)?;
                let peaks = self.session.waveform(id, width.unwrap_or(self.waveform_width))?;
                println!("{stem:>8} {}", text_waveform(&peaks));
            }
            Command::Songs => {
                let selected = self.library.catalog().selected().map(|s| s.song_id.clone());
                for song in self.library.catalog().songs() {
                    let mark = if Some(&song.song_id) == selected.as_ref() { '*' } else { ' ' };
                    println!("{mark} {:<24} {:?} {}", song.song_id, song.status, song.original_name);
                }
            }
            Command::Load(song_id) => {
                if !self.library.select(&song_id) {
                    anyhow::bail!("no song '{song_id}'");
                }
                self.load_selected()?;
            }
            Command::Stems => self.print_stems(),
            Command::Status => self.print_status(),
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    fn print_status(&self) {
        println!(
            "{} {:.2}s / {:.2}s  master {:.2}",
            if self.session.is_playing() { "playing" } else { "paused " },
            self.session.position(),
            self.session.max_duration(),
            self.session.master_volume()
        );
        println!("{}", progress_bar(self.session.cursor_percent(), 40));
    }

    fn print_stems(&self) {
        for track in self.session.stems() {
            let p = track.params();
            let mut flags = String::new();
            if track.is_muted() {
                flags.push_str(" muted");
            }
            if track.is_bypassed() {
                flags.push_str(" bypass");
            }
            if !track.distortion_enabled() {
                flags.push_str(" no-dist");
            }
            println!(
                "{:>8} {:5.1}s vol {:.2} | pre {:.2} comp {:.2} tone {:.2} dist {:.2}{}",
                track.name(),
                track.duration(),
                track.volume(),
                p.pregain,
                p.compression,
                p.tone,
                p.distortion,
                flags
            );
        }
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = channel::unbounded();
    let spawned = std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        log::error!("Failed to start input thread: {}", e);
    }
    rx
}

/// `[#######.......]  42.0%`
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!(
        "[{}{}] {:5.1}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent
    )
}

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One block character per column, taller for louder columns
pub fn text_waveform(peaks: &[Peak]) -> String {
    let height = (LEVELS.len() * 2) as f32;
    peaks
        .iter()
        .map(|peak| {
            let (_, thickness) = peak.pixel_span(height);
            let level = ((thickness / 2.0).ceil() as usize).clamp(1, LEVELS.len());
            LEVELS[level - 1]
        })
        .collect()
}
