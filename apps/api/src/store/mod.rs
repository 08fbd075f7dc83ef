//! Persistence seam. The rest of the crate talks to these traits only;
//! `PgStore` backs them in production and `MemoryStore` in tests.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::response::{PriorResponse, ResponseRecord};
use crate::models::song::Song;
use crate::models::user::{NewUser, Profile, User};

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

#[async_trait]
pub trait SongStore: Send + Sync {
    /// Songs with both eligibility flags set.
    async fn eligible_songs(&self) -> Result<Vec<Song>, StoreError>;

    async fn count_eligible_songs(&self) -> Result<i64, StoreError>;

    /// Number of stored responses per song id, across all users.
    /// Songs without responses are absent from the map.
    async fn response_counts(&self) -> Result<HashMap<String, i64>, StoreError>;
}

#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Insert-or-update keyed on (user_id, song_id). On update every field is
    /// overwritten except `created_at`.
    async fn upsert_response(&self, record: &ResponseRecord) -> Result<(), StoreError>;

    async fn responses_for_user(&self, user_id: Uuid) -> Result<Vec<PriorResponse>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `StoreError::UniqueViolation` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn update_profile(&self, user_id: Uuid, profile: &Profile) -> Result<(), StoreError>;
}

/// Everything the survey needs from the database.
pub trait SurveyStore: SongStore + ResponseStore + UserStore {}

impl<T: SongStore + ResponseStore + UserStore> SurveyStore for T {}
