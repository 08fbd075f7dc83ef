//! In-process store used by unit tests. Mirrors the Postgres semantics that
//! matter to callers: unique emails, upsert on (user_id, song_id) keeping
//! `created_at`, and failure switches for the degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ResponseStore, SongStore, StoreError, UserStore};
use crate::models::response::{PriorResponse, ResponseRecord};
use crate::models::song::Song;
use crate::models::user::{NewUser, Profile, User};

#[derive(Default)]
pub struct MemoryStore {
    songs: Mutex<Vec<Song>>,
    responses: Mutex<Vec<ResponseRecord>>,
    users: Mutex<Vec<User>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with_songs(songs: Vec<Song>) -> Self {
        MemoryStore {
            songs: Mutex::new(songs),
            ..Default::default()
        }
    }

    pub fn responses(&self) -> Vec<ResponseRecord> {
        self.responses.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    pub fn deactivate(&self, email: &str) {
        for user in self.users.lock().unwrap().iter_mut() {
            if user.email == email {
                user.is_active = false;
            }
        }
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SongStore for MemoryStore {
    async fn eligible_songs(&self) -> Result<Vec<Song>, StoreError> {
        self.check_read()?;
        Ok(self.songs.lock().unwrap().clone())
    }

    async fn count_eligible_songs(&self) -> Result<i64, StoreError> {
        self.check_read()?;
        Ok(self.songs.lock().unwrap().len() as i64)
    }

    async fn response_counts(&self) -> Result<HashMap<String, i64>, StoreError> {
        self.check_read()?;
        let mut counts = HashMap::new();
        for record in self.responses.lock().unwrap().iter() {
            *counts.entry(record.song_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn upsert_response(&self, record: &ResponseRecord) -> Result<(), StoreError> {
        self.check_write()?;
        let mut responses = self.responses.lock().unwrap();
        match responses
            .iter_mut()
            .find(|r| r.user_id == record.user_id && r.song_id == record.song_id)
        {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = record.clone();
                existing.created_at = created_at;
            }
            None => responses.push(record.clone()),
        }
        Ok(())
    }

    async fn responses_for_user(&self, user_id: Uuid) -> Result<Vec<PriorResponse>, StoreError> {
        self.check_read()?;
        Ok(self
            .responses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| PriorResponse {
                song_id: r.song_id.clone(),
                status: r.status.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_read()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.check_write()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            gender: user.profile.gender,
            age: user.profile.age,
            created_at: Utc::now(),
            last_login_at: None,
            is_active: true,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_write()?;
        for user in self.users.lock().unwrap().iter_mut() {
            if user.id == user_id {
                user.last_login_at = Some(at);
            }
        }
        Ok(())
    }

    async fn update_profile(&self, user_id: Uuid, profile: &Profile) -> Result<(), StoreError> {
        self.check_write()?;
        for user in self.users.lock().unwrap().iter_mut() {
            if user.id == user_id {
                user.gender = profile.gender.clone();
                user.age = profile.age;
            }
        }
        Ok(())
    }
}

/// Songs `s0..sN` with predictable metadata.
pub fn sample_songs(n: usize) -> Vec<Song> {
    (0..n)
        .map(|i| Song {
            id: format!("s{i}"),
            artist: format!("Artist {i}"),
            title: format!("Title {i}"),
            genre: "reggaeton".to_string(),
            release_date: Some("2019-05-17".to_string()),
            popularity: Some(50),
            spotify_id: Some(format!("sp{i}")),
            youtube_id: Some(format!("yt{i}")),
            duration_ms: Some(180_000),
        })
        .collect()
}
