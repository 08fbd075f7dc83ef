use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A study song as stored in the songs table. Read-only for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: String,
    pub artist: String,
    pub title: String,
    pub genre: String,
    pub release_date: Option<String>,
    /// Spotify popularity, 0 – 100.
    pub popularity: Option<i32>,
    pub spotify_id: Option<String>,
    /// Embeddable video reference for the player.
    pub youtube_id: Option<String>,
    pub duration_ms: Option<i64>,
}
