use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::response::PriorResponse;
use crate::models::song::Song;
use crate::models::user::{Account, Profile};
use crate::survey::progress::{ProgressStats, SessionProgress, SongStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    AwaitingAuth,
    AwaitingProfile,
    InProgress,
    Completed,
}

/// Snapshot of the participant attached to every saved response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub user_id: Option<Uuid>,
    pub gender: Option<String>,
    pub age: Option<i32>,
}

/// State of one participant's visit: who they are plus their progress.
/// Owned by the session registry and handed by `&mut` to every transition.
#[derive(Debug, Clone)]
pub struct SurveySession {
    id: Uuid,
    progress: SessionProgress,
    account: Option<Account>,
    profile: Profile,
    /// Set when an answer leaves no unvisited song, even if some were skipped.
    study_finished: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub account: Option<Account>,
    pub profile: Profile,
    pub current_index: usize,
    pub current_song: Option<Song>,
    pub stats: ProgressStats,
    pub is_complete: bool,
    pub session_duration_seconds: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SongListEntry {
    pub index: usize,
    pub song_id: String,
    pub artist: String,
    pub title: String,
    pub status: SongStatus,
    pub is_current: bool,
}

impl SurveySession {
    pub fn new(id: Uuid, songs: Vec<Song>) -> Self {
        let mut progress = SessionProgress::new();
        progress.initialize();
        progress.load_songs(songs);
        SurveySession {
            id,
            progress,
            account: None,
            profile: Profile::default(),
            study_finished: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn progress(&self) -> &SessionProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut SessionProgress {
        &mut self.progress
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Attaches a signed-in account and restores its stored progress.
    /// Any previous identity is dropped together with its progress.
    pub fn authenticate(&mut self, account: Account, history: &[PriorResponse]) {
        if self.account.is_some() {
            self.reset();
        }
        self.profile = account.profile.clone();
        self.account = Some(account);
        self.progress.sync_from_store(history);
        self.progress.touch();
    }

    pub fn set_profile(&mut self, profile: Profile) {
        if let Some(account) = self.account.as_mut() {
            account.profile = profile.clone();
        }
        self.profile = profile;
        self.progress.touch();
    }

    pub fn user_data(&self) -> UserData {
        UserData {
            user_id: self.account.as_ref().map(|a| a.id),
            gender: self.profile.gender.clone(),
            age: self.profile.age,
        }
    }

    pub fn mark_finished(&mut self) {
        self.study_finished = true;
    }

    /// Forgets identity, profile and progress; the song list stays loaded.
    pub fn reset(&mut self) {
        self.account = None;
        self.profile = Profile::default();
        self.study_finished = false;
        self.progress.reset();
    }

    pub fn phase(&mut self) -> SessionPhase {
        if !self.progress.is_initialized() {
            SessionPhase::Uninitialized
        } else if self.account.is_none() {
            SessionPhase::AwaitingAuth
        } else if !self.profile.is_complete() {
            SessionPhase::AwaitingProfile
        } else if self.progress.is_complete() || self.study_finished {
            SessionPhase::Completed
        } else {
            SessionPhase::InProgress
        }
    }

    pub fn view(&mut self, timeout: Duration) -> SessionView {
        let phase = self.phase();
        SessionView {
            session_id: self.id,
            phase,
            account: self.account.clone(),
            profile: self.profile.clone(),
            current_index: self.progress.current_index(),
            current_song: self.progress.current_song().cloned(),
            stats: self.progress.progress_stats(),
            is_complete: self.progress.is_complete(),
            session_duration_seconds: self.progress.session_duration(),
            started_at: self.progress.started_at(),
            last_activity_at: self.progress.last_activity_at(),
            expired: self.progress.is_expired(timeout),
        }
    }

    pub fn song_list(&self) -> Vec<SongListEntry> {
        let current = self.progress.current_index();
        self.progress
            .songs()
            .iter()
            .enumerate()
            .map(|(index, song)| SongListEntry {
                index,
                song_id: song.id.clone(),
                artist: song.artist.clone(),
                title: song.title.clone(),
                status: self.progress.song_status(index),
                is_current: index == current,
            })
            .collect()
    }
}
