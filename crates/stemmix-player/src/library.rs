//! Songs on disk
//!
//! A song is a directory of stem files named after the stem
//! (`drums.wav`, `vocals.flac`, ...). A library is a directory of songs.
//! A song directory may carry a `song.yaml` record in the same shape the
//! upload service reports; otherwise one is derived from the files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stemmix_core::audio_file::EncodedStem;
use stemmix_core::error::LoadError;
use stemmix_core::session::LoadFailure;
use stemmix_core::song::{Song, SongCatalog, SongStatus, StemInfo};

pub const MANIFEST_FILE: &str = "song.yaml";

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "flac", "mp3"];

fn is_audio_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
}

fn audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_audio_file(p))
        .collect();
    files.sort();
    Ok(files)
}

/// The selected song's stem files, read into memory
pub struct SongStems {
    pub song: Song,
    pub stems: Vec<EncodedStem>,
    /// Listed stems whose files could not be read
    pub unreadable: Vec<LoadFailure>,
}

pub struct Library {
    catalog: SongCatalog,
    dirs: HashMap<String, PathBuf>,
}

impl Library {
    /// Scan `path` as a single song if it holds stem files, else as a library
    pub fn scan(path: &Path) -> Result<Self> {
        let mut songs = Vec::new();
        let mut dirs = HashMap::new();

        let song_dirs: Vec<PathBuf> = if !audio_files(path)?.is_empty() || path.join(MANIFEST_FILE).is_file() {
            vec![path.to_path_buf()]
        } else {
            let mut subdirs: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Failed to read library {:?}", path))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_dir())
                .collect();
            subdirs.sort();
            subdirs
        };

        for dir in song_dirs {
            match read_song(&dir) {
                Ok(song) => {
                    dirs.insert(song.song_id.clone(), dir);
                    songs.push(song);
                }
                Err(e) => log::warn!("Skipping {:?}: {:#}", dir, e),
            }
        }

        log::info!("Found {} songs under {:?}", songs.len(), path);
        let mut catalog = SongCatalog::new();
        catalog.refresh(songs);
        Ok(Self { catalog, dirs })
    }

    pub fn catalog(&self) -> &SongCatalog {
        &self.catalog
    }

    pub fn select(&mut self, song_id: &str) -> bool {
        self.catalog.select(song_id)
    }

    /// Read the selected song's stem files
    ///
    /// Unreadable files are left out and reported in the same shape as
    /// stems that later fail to decode.
    pub fn selected_stems(&self) -> Result<SongStems> {
        let song = self
            .catalog
            .selected()
            .cloned()
            .context("No song selected")?;
        let dir = self
            .dirs
            .get(&song.song_id)
            .with_context(|| format!("No directory for song {}", song.song_id))?;

        let mut stems = Vec::with_capacity(song.stems.len());
        let mut unreadable = Vec::new();
        for info in &song.stems {
            let path = dir.join(&info.url);
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let mut stem = EncodedStem::new(info.name.clone(), bytes);
                    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                        stem = stem.with_extension(ext);
                    }
                    stems.push(stem);
                }
                Err(e) => {
                    log::warn!("Cannot read stem '{}' at {:?}: {}", info.name, path, e);
                    unreadable.push(LoadFailure {
                        name: info.name.clone(),
                        error: LoadError::Unavailable(format!("{}: {}", info.url, e)),
                    });
                }
            }
        }
        Ok(SongStems {
            song,
            stems,
            unreadable,
        })
    }
}

/// Song record from `song.yaml`, or derived from the stem files
fn read_song(dir: &Path) -> Result<Song> {
    let manifest = dir.join(MANIFEST_FILE);
    if manifest.is_file() {
        let text = std::fs::read_to_string(&manifest)
            .with_context(|| format!("Failed to read {:?}", manifest))?;
        return serde_yaml::from_str(&text).with_context(|| format!("Invalid {:?}", manifest));
    }

    let dir_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("song")
        .to_string();

    let stems: Vec<StemInfo> = audio_files(dir)?
        .iter()
        .filter_map(|path| {
            let name = path.file_stem()?.to_str()?.to_string();
            let url = path.file_name()?.to_str()?.to_string();
            Some(StemInfo { name, url })
        })
        .collect();

    Ok(Song {
        song_id: dir_name.clone(),
        original_name: dir_name,
        status: if stems.is_empty() {
            SongStatus::Processing
        } else {
            SongStatus::Ready
        },
        stems,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"RIFF").unwrap();
    }

    #[test]
    fn test_single_song_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("vocals.wav"));
        touch(&dir.path().join("drums.flac"));
        touch(&dir.path().join("notes.txt"));

        let library = Library::scan(dir.path()).unwrap();
        let song = library.catalog().selected().unwrap();
        let names: Vec<_> = song.stems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["drums", "vocals"]);
        assert!(song.is_ready());

        let selected = library.selected_stems().unwrap();
        assert_eq!(selected.stems.len(), 2);
        assert_eq!(selected.stems[0].extension.as_deref(), Some("flac"));
        assert!(selected.unreadable.is_empty());
    }

    #[test]
    fn test_library_prefers_ready_song() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("a-pending")).unwrap();
        let ready = root.path().join("b-ready");
        std::fs::create_dir(&ready).unwrap();
        touch(&ready.join("bass.wav"));

        let mut library = Library::scan(root.path()).unwrap();
        assert_eq!(library.catalog().songs().len(), 2);
        assert_eq!(library.catalog().selected().unwrap().song_id, "b-ready");

        assert!(library.select("a-pending"));
        assert!(!library.select("missing"));
    }

    #[test]
    fn test_manifest_overrides_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("track-0.wav"));
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            "songId: s-42\noriginalName: Demo.mp3\nstatus: ready\nstems:\n  - name: guitar\n    url: track-0.wav\n  - name: piano\n    url: missing.wav\n",
        )
        .unwrap();

        let library = Library::scan(dir.path()).unwrap();
        let selected = library.selected_stems().unwrap();
        assert_eq!(selected.song.song_id, "s-42");
        assert_eq!(selected.stems.len(), 1);
        assert_eq!(selected.stems[0].name, "guitar");

        assert_eq!(selected.unreadable.len(), 1);
        assert_eq!(selected.unreadable[0].name, "piano");
        assert!(matches!(selected.unreadable[0].error, LoadError::Unavailable(_)));
    }
}
