use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tri-state content judgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    No,
    Yes,
    Unsure,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::No => "no",
            Verdict::Yes => "yes",
            Verdict::Unsure => "unsure",
        }
    }
}

/// Five-step ordinal confidence scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryUnsure,
    Unsure,
    Neutral,
    Sure,
    VerySure,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryUnsure => "very_unsure",
            ConfidenceLevel::Unsure => "unsure",
            ConfidenceLevel::Neutral => "neutral",
            ConfidenceLevel::Sure => "sure",
            ConfidenceLevel::VerySure => "very_sure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Skipped,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Completed => "completed",
            ResponseStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ResponseStatus::Completed),
            "skipped" => Ok(ResponseStatus::Skipped),
            other => Err(format!("unknown response status '{other}'")),
        }
    }
}

/// Longest free-text comment accepted with a classification.
pub const MAX_COMMENT_CHARS: usize = 500;

/// Comment stored on skipped responses.
pub const SKIP_COMMENT: &str = "skipped";

pub const CLASSIFICATION_SOURCE: &str = "human_study_frontend";

/// A participant's judgement on one song, as submitted from the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub explicit_content: Verdict,
    /// None when the participant collapsed the extended questions.
    #[serde(default)]
    pub sexual_content: Option<Verdict>,
    #[serde(default)]
    pub confidence_level: Option<ConfidenceLevel>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// One row of the responses table: a denormalized snapshot of the user,
/// the song and the classification. Unique on (user_id, song_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResponseRecord {
    pub user_id: Uuid,
    pub user_gender: Option<String>,
    pub user_age: Option<i32>,

    pub song_id: String,
    pub spotify_id: Option<String>,
    pub artist: String,
    pub title: String,
    pub genre: String,
    pub release_date: Option<String>,
    pub popularity: Option<i32>,

    pub explicit_content: Option<String>,
    pub sexual_content: Option<String>,
    pub confidence_level: Option<String>,
    pub comments: Option<String>,
    pub status: String,

    pub song_index: i32,
    pub session_duration_seconds: f64,
    pub classification_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a stored response needed to restore progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriorResponse {
    pub song_id: String,
    pub status: String,
}

impl PriorResponse {
    /// Anything other than an explicit skip counts as completed.
    pub fn response_status(&self) -> ResponseStatus {
        self.status.parse().unwrap_or(ResponseStatus::Completed)
    }
}
