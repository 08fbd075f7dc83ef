use chrono::Utc;
use tracing::{error, info};

use crate::models::response::{
    Classification, ConfidenceLevel, ResponseRecord, ResponseStatus, Verdict,
    CLASSIFICATION_SOURCE, SKIP_COMMENT,
};
use crate::models::song::Song;
use crate::store::ResponseStore;
use crate::survey::session::UserData;

/// What gets written for one song: either a full classification or a skip.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub song_index: usize,
    pub status: ResponseStatus,
    pub explicit_content: Option<Verdict>,
    pub sexual_content: Option<Verdict>,
    pub confidence_level: Option<ConfidenceLevel>,
    pub comments: Option<String>,
    pub session_duration_seconds: f64,
}

impl Submission {
    pub fn completed(song_index: usize, c: &Classification, session_duration_seconds: f64) -> Self {
        Submission {
            song_index,
            status: ResponseStatus::Completed,
            explicit_content: Some(c.explicit_content),
            sexual_content: c.sexual_content,
            confidence_level: c.confidence_level,
            comments: c
                .comments
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            session_duration_seconds,
        }
    }

    /// Skips carry no judgement, only the skip marker.
    pub fn skipped(song_index: usize, session_duration_seconds: f64) -> Self {
        Submission {
            song_index,
            status: ResponseStatus::Skipped,
            explicit_content: None,
            sexual_content: None,
            confidence_level: None,
            comments: Some(SKIP_COMMENT.to_string()),
            session_duration_seconds,
        }
    }
}

/// Builds the denormalized row. None when the session has no signed-in user.
pub fn build_record(user: &UserData, song: &Song, submission: &Submission) -> Option<ResponseRecord> {
    let user_id = user.user_id?;
    let now = Utc::now();
    Some(ResponseRecord {
        user_id,
        user_gender: user.gender.clone(),
        user_age: user.age,

        song_id: song.id.clone(),
        spotify_id: song.spotify_id.clone(),
        artist: song.artist.clone(),
        title: song.title.clone(),
        genre: song.genre.clone(),
        release_date: song.release_date.clone(),
        popularity: song.popularity,

        explicit_content: submission.explicit_content.map(|v| v.as_str().to_string()),
        sexual_content: submission.sexual_content.map(|v| v.as_str().to_string()),
        confidence_level: submission.confidence_level.map(|c| c.as_str().to_string()),
        comments: submission.comments.clone(),
        status: submission.status.as_str().to_string(),

        song_index: i32::try_from(submission.song_index).unwrap_or(i32::MAX),
        session_duration_seconds: submission.session_duration_seconds,
        classification_source: CLASSIFICATION_SOURCE.to_string(),
        created_at: now,
        updated_at: now,
    })
}

/// Upserts one response for (user, song). Never fails loudly: any problem is
/// logged and reported as `false` so the caller can ask for a retry.
pub async fn save_classification<S: ResponseStore + ?Sized>(
    store: &S,
    user: &UserData,
    song: &Song,
    submission: &Submission,
) -> bool {
    let Some(record) = build_record(user, song, submission) else {
        error!("Refusing to save response for song {} without a user", song.id);
        return false;
    };

    match store.upsert_response(&record).await {
        Ok(()) => {
            info!(
                "Saved {} response for user {} song {}",
                record.status, record.user_id, record.song_id
            );
            true
        }
        Err(e) => {
            error!(
                "Error saving response for user {} song {}: {e}",
                record.user_id, record.song_id
            );
            false
        }
    }
}
