//! Song records from the stem source provider and the current selection

use serde::{Deserialize, Serialize};

/// Separation progress of an uploaded song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
}

/// Where one stem of a song can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemInfo {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub song_id: String,
    pub original_name: String,
    pub status: SongStatus,
    #[serde(default)]
    pub stems: Vec<StemInfo>,
}

impl Song {
    pub fn is_ready(&self) -> bool {
        self.status == SongStatus::Ready
    }
}

/// Song list plus the selected song id
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
    selected: Option<String>,
}

impl SongCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list, keeping the selection when possible
    ///
    /// A selected song that is still listed stays selected. If it vanished
    /// the first song is selected. With no prior selection the first ready
    /// song wins, falling back to the first song. An empty list clears the
    /// selection.
    pub fn refresh(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.selected = match self.selected.take() {
            _ if self.songs.is_empty() => None,
            Some(id) if self.songs.iter().any(|s| s.song_id == id) => Some(id),
            Some(_) => Some(self.songs[0].song_id.clone()),
            None => self
                .songs
                .iter()
                .find(|s| s.is_ready())
                .or_else(|| self.songs.first())
                .map(|s| s.song_id.clone()),
        };
    }

    /// Select a listed song; returns `false` for an unknown id
    pub fn select(&mut self, song_id: &str) -> bool {
        if self.songs.iter().any(|s| s.song_id == song_id) {
            self.selected = Some(song_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&Song> {
        let id = self.selected.as_deref()?;
        self.songs.iter().find(|s| s.song_id == id)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }
}
