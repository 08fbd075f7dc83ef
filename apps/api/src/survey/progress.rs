//! Per-session progress through the ordered song list.
//!
//! Completed and skipped indices are tracked in two sets. Marking an index
//! completed removes it from the skipped set, but marking it skipped leaves
//! an earlier completion in place: a completed answer outranks a later skip.
//! Counts and listings therefore treat an index present in both sets as
//! completed.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::response::{PriorResponse, ResponseStatus};
use crate::models::song::Song;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    Pending,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct SessionProgress {
    songs: Vec<Song>,
    index_by_song_id: HashMap<String, usize>,
    current_index: usize,
    completed: BTreeSet<usize>,
    skipped: BTreeSet<usize>,
    started_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
    completion_latched: bool,
    synced: bool,
}

impl SessionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the session clock and clears progress on the first call only.
    pub fn initialize(&mut self) {
        if self.started_at.is_some() {
            return;
        }
        let now = Utc::now();
        self.current_index = 0;
        self.completed.clear();
        self.skipped.clear();
        self.started_at = Some(now);
        self.last_activity_at = Some(now);
        self.completion_latched = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.started_at.is_some()
    }

    /// Stores the ordered song list and rebuilds the id → index lookup.
    pub fn load_songs(&mut self, songs: Vec<Song>) {
        self.index_by_song_id = songs
            .iter()
            .enumerate()
            .map(|(idx, song)| (song.id.clone(), idx))
            .collect();
        self.songs = songs;

        let total = self.songs.len();
        self.completed.retain(|&i| i < total);
        self.skipped.retain(|&i| i < total);
        if self.current_index >= total {
            self.current_index = 0;
        }
    }

    /// Applies a user's stored history once per session. Entries for songs
    /// outside this session's list are ignored. Returns false when history
    /// was already applied.
    pub fn sync_from_store(&mut self, prior: &[PriorResponse]) -> bool {
        if self.synced {
            return false;
        }
        for response in prior {
            let Some(idx) = self.index_of(&response.song_id) else {
                continue;
            };
            match response.response_status() {
                ResponseStatus::Skipped => {
                    self.skipped.insert(idx);
                }
                ResponseStatus::Completed => {
                    self.completed.insert(idx);
                }
            }
        }
        self.synced = true;
        true
    }

    #[cfg(test)]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Records the outcome for one song. Out-of-range indices are rejected.
    pub fn mark_song_result(&mut self, index: usize, status: ResponseStatus) -> bool {
        if index >= self.songs.len() {
            return false;
        }
        match status {
            ResponseStatus::Completed => {
                self.completed.insert(index);
                self.skipped.remove(&index);
            }
            ResponseStatus::Skipped => {
                // Completion is kept on purpose, see module docs.
                self.skipped.insert(index);
            }
        }
        self.touch();
        true
    }

    fn is_visited(&self, index: usize) -> bool {
        self.completed.contains(&index) || self.skipped.contains(&index)
    }

    /// First index after the current one that is neither completed nor
    /// skipped, wrapping around to the start. None once every song is visited.
    pub fn next_unvisited_index(&self) -> Option<usize> {
        let total = self.songs.len();
        let current = self.current_index.min(total);
        (current + 1..total)
            .chain(0..current)
            .find(|&i| !self.is_visited(i))
    }

    pub fn navigate_to(&mut self, index: usize) -> bool {
        if index >= self.songs.len() {
            return false;
        }
        self.current_index = index;
        self.touch();
        true
    }

    /// Steps back one song; false when already at the first song.
    pub fn previous(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(prev) => self.navigate_to(prev),
            None => false,
        }
    }

    pub fn progress_stats(&self) -> ProgressStats {
        let total = self.songs.len();
        let completed = self.completed.len();
        let skipped = self.skipped.difference(&self.completed).count();
        let percentage = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        ProgressStats {
            total,
            completed,
            skipped,
            remaining: total.saturating_sub(completed + skipped),
            percentage,
        }
    }

    /// True once every song has been completed. The result latches: after it
    /// has been observed true it stays true for the rest of the session.
    pub fn is_complete(&mut self) -> bool {
        let total = self.songs.len();
        if total > 0 && self.completed.len() >= total {
            self.completion_latched = true;
        }
        self.completion_latched
    }

    /// Clears progress and re-initializes; the loaded songs are kept.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.last_activity_at = None;
        self.synced = false;
        self.initialize();
    }

    pub fn session_duration(&self) -> f64 {
        self.session_duration_at(Utc::now())
    }

    pub fn session_duration_at(&self, now: DateTime<Utc>) -> f64 {
        match self.started_at {
            Some(started) => (now - started).num_milliseconds().max(0) as f64 / 1000.0,
            None => 0.0,
        }
    }

    /// Advisory inactivity check; nothing is torn down when it returns true.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.is_expired_at(Utc::now(), timeout)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match self.last_activity_at {
            Some(last) => now - last > timeout,
            None => false,
        }
    }

    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    pub fn touch_at(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = Some(now);
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.current_index)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn index_of(&self, song_id: &str) -> Option<usize> {
        self.index_by_song_id.get(song_id).copied()
    }

    pub fn song_status(&self, index: usize) -> SongStatus {
        if self.completed.contains(&index) {
            SongStatus::Completed
        } else if self.skipped.contains(&index) {
            SongStatus::Skipped
        } else {
            SongStatus::Pending
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity_at
    }

    #[cfg(test)]
    fn sets(&self) -> (&BTreeSet<usize>, &BTreeSet<usize>) {
        (&self.completed, &self.skipped)
    }
}
