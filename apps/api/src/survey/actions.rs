//! State transitions for participant actions. Each function performs at most
//! one store round trip and touches the session only after that call has
//! succeeded, so a failed write leaves progress exactly as it was.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::service::validate_profile_fields;
use crate::auth::AuthService;
use crate::errors::AppError;
use crate::models::response::{Classification, MAX_COMMENT_CHARS};
use crate::models::user::{Account, Profile};
use crate::store::{ResponseStore, SongStore};
use crate::survey::recorder::{save_classification, Submission};
use crate::survey::selector::select_songs;
use crate::survey::session::SurveySession;

/// Where the session pointer ended up after an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Moved { index: usize },
    Finished,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
    pub gender: Option<String>,
    pub age: Option<i32>,
    #[serde(default)]
    pub terms_accepted: bool,
}

/// Starts a session over a freshly selected song order.
pub async fn start_session<S: SongStore + ?Sized>(store: &S) -> Result<SurveySession, AppError> {
    let songs = select_songs(store).await;
    if songs.is_empty() {
        return Err(AppError::NoEligibleSongs);
    }
    let session = SurveySession::new(Uuid::new_v4(), songs);
    info!(
        "Started session {} with {} songs",
        session.id(),
        session.progress().songs().len()
    );
    Ok(session)
}

pub async fn register(
    session: &mut SurveySession,
    auth: &AuthService,
    email: &str,
    password: &str,
    profile: Profile,
) -> Result<Account, AppError> {
    require_signed_out(session)?;
    let account = auth.register(email, password, profile).await?;
    let history = auth.prior_history(account.id).await;
    session.authenticate(account.clone(), &history);
    Ok(account)
}

pub async fn login(
    session: &mut SurveySession,
    auth: &AuthService,
    email: &str,
    password: &str,
) -> Result<Account, AppError> {
    require_signed_out(session)?;
    let account = auth.login(email, password).await?;
    let history = auth.prior_history(account.id).await;
    session.authenticate(account.clone(), &history);
    Ok(account)
}

/// The demographic step: both fields and consent are mandatory here.
pub async fn complete_profile(
    session: &mut SurveySession,
    auth: &AuthService,
    form: ProfileForm,
) -> Result<(), AppError> {
    let user_id = session
        .account()
        .map(|a| a.id)
        .ok_or(AppError::AuthenticationRequired)?;

    if form.gender.is_none() || form.age.is_none() {
        return Err(AppError::Validation(
            "Gender and age are required".to_string(),
        ));
    }
    if !form.terms_accepted {
        return Err(AppError::Validation(
            "You must accept the study terms to continue".to_string(),
        ));
    }
    let profile = Profile {
        gender: form.gender,
        age: form.age,
    };
    validate_profile_fields(&profile)?;

    auth.update_profile(user_id, &profile).await;
    session.set_profile(profile);
    Ok(())
}

/// A session carries one identity; switching users goes through `reset` first.
fn require_signed_out(session: &SurveySession) -> Result<(), AppError> {
    if session.account().is_some() {
        return Err(AppError::Conflict(
            "This session is already signed in; reset it before switching accounts".to_string(),
        ));
    }
    Ok(())
}

fn require_participant(session: &SurveySession) -> Result<(), AppError> {
    if session.account().is_none() {
        return Err(AppError::AuthenticationRequired);
    }
    if !session.profile().is_complete() {
        return Err(AppError::ProfileRequired);
    }
    Ok(())
}

fn validate_classification(classification: &Classification) -> Result<(), AppError> {
    if let Some(comments) = classification.comments.as_deref() {
        if comments.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::Validation(format!(
                "Comments are limited to {MAX_COMMENT_CHARS} characters"
            )));
        }
    }
    Ok(())
}

/// Saves the classification for the current song and moves on.
pub async fn submit<S: ResponseStore + ?Sized>(
    session: &mut SurveySession,
    store: &S,
    classification: &Classification,
) -> Result<Transition, AppError> {
    require_participant(session)?;
    validate_classification(classification)?;

    let index = session.progress().current_index();
    let submission =
        Submission::completed(index, classification, session.progress().session_duration());
    record_and_advance(session, store, submission).await
}

/// Stores a skip for the current song and moves on.
pub async fn skip<S: ResponseStore + ?Sized>(
    session: &mut SurveySession,
    store: &S,
) -> Result<Transition, AppError> {
    require_participant(session)?;

    let index = session.progress().current_index();
    let submission = Submission::skipped(index, session.progress().session_duration());
    record_and_advance(session, store, submission).await
}

async fn record_and_advance<S: ResponseStore + ?Sized>(
    session: &mut SurveySession,
    store: &S,
    submission: Submission,
) -> Result<Transition, AppError> {
    let song = session
        .progress()
        .current_song()
        .cloned()
        .ok_or_else(|| AppError::Validation("No song at the current position".to_string()))?;
    let user = session.user_data();

    if !save_classification(store, &user, &song, &submission).await {
        return Err(AppError::Persistence(format!(
            "response for song {} was not stored",
            song.id
        )));
    }

    session
        .progress_mut()
        .mark_song_result(submission.song_index, submission.status);
    Ok(advance(session))
}

fn advance(session: &mut SurveySession) -> Transition {
    match session.progress().next_unvisited_index() {
        Some(next) => {
            session.progress_mut().navigate_to(next);
            Transition::Moved { index: next }
        }
        None => {
            session.mark_finished();
            Transition::Finished
        }
    }
}

pub fn previous(session: &mut SurveySession) -> Result<usize, AppError> {
    if !session.progress_mut().previous() {
        return Err(AppError::Validation("Already at the first song".to_string()));
    }
    Ok(session.progress().current_index())
}

pub fn navigate(session: &mut SurveySession, index: usize) -> Result<usize, AppError> {
    let total = session.progress().songs().len();
    if !session.progress_mut().navigate_to(index) {
        return Err(AppError::Validation(format!(
            "Song index {index} is out of range (0..{total})"
        )));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response::{ConfidenceLevel, Verdict};
    use crate::survey::progress::SongStatus;
    use crate::store::memory::{sample_songs, MemoryStore};
    use crate::store::SurveyStore;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn classification() -> Classification {
        Classification {
            explicit_content: Verdict::Yes,
            sexual_content: Some(Verdict::Unsure),
            confidence_level: Some(ConfidenceLevel::Neutral),
            comments: None,
        }
    }

    fn profile_form() -> ProfileForm {
        ProfileForm {
            gender: Some("female".to_string()),
            age: Some(25),
            terms_accepted: true,
        }
    }

    async fn ready_session(songs: usize) -> (SurveySession, AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_songs(sample_songs(songs)));
        let dyn_store: Arc<dyn SurveyStore> = store.clone();
        let auth = AuthService::new(dyn_store);
        let mut session = start_session(store.as_ref()).await.unwrap();
        register(&mut session, &auth, "ana@example.com", "pw", Profile::default())
            .await
            .unwrap();
        complete_profile(&mut session, &auth, profile_form())
            .await
            .unwrap();
        (session, auth, store)
    }

    #[tokio::test]
    async fn test_start_session_without_songs_fails() {
        let store = MemoryStore::default();
        let err = start_session(&store).await.unwrap_err();
        assert!(matches!(err, AppError::NoEligibleSongs));
    }

    #[tokio::test]
    async fn test_submit_requires_sign_in_and_profile() {
        let store = Arc::new(MemoryStore::with_songs(sample_songs(2)));
        let dyn_store: Arc<dyn SurveyStore> = store.clone();
        let auth = AuthService::new(dyn_store);
        let mut session = start_session(store.as_ref()).await.unwrap();

        let err = submit(&mut session, store.as_ref(), &classification())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthenticationRequired));

        register(&mut session, &auth, "ana@example.com", "pw", Profile::default())
            .await
            .unwrap();
        let err = skip(&mut session, store.as_ref()).await.unwrap_err();
        assert!(matches!(err, AppError::ProfileRequired));
        assert!(store.responses().is_empty());
    }

    #[tokio::test]
    async fn test_profile_requires_consent() {
        let (mut session, auth, _) = ready_session(1).await;
        let form = ProfileForm {
            terms_accepted: false,
            ..profile_form()
        };
        let err = complete_profile(&mut session, &auth, form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_profile_is_persisted_on_account() {
        let (session, _, store) = ready_session(1).await;
        assert!(session.profile().is_complete());
        assert_eq!(store.users()[0].age, Some(25));
        assert_eq!(store.users()[0].gender.as_deref(), Some("female"));
    }

    #[tokio::test]
    async fn test_submit_saves_and_advances() {
        let (mut session, _, store) = ready_session(3).await;
        let first = session.progress().current_song().unwrap().id.clone();

        let transition = submit(&mut session, store.as_ref(), &classification())
            .await
            .unwrap();

        assert_eq!(transition, Transition::Moved { index: 1 });
        assert_eq!(session.progress().song_status(0), SongStatus::Completed);
        let rows = store.responses();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].song_id, first);
        assert_eq!(rows[0].user_gender.as_deref(), Some("female"));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_progress_untouched() {
        let (mut session, _, store) = ready_session(3).await;
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = submit(&mut session, store.as_ref(), &classification())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(session.progress().current_index(), 0);
        assert_eq!(session.progress().progress_stats().completed, 0);
    }

    #[tokio::test]
    async fn test_long_comment_rejected_before_write() {
        let (mut session, _, store) = ready_session(1).await;
        let mut c = classification();
        c.comments = Some("x".repeat(MAX_COMMENT_CHARS + 1));

        let err = submit(&mut session, store.as_ref(), &c).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.responses().is_empty());
    }

    #[tokio::test]
    async fn test_skipping_everything_finishes_study() {
        let (mut session, _, store) = ready_session(2).await;

        assert_eq!(
            skip(&mut session, store.as_ref()).await.unwrap(),
            Transition::Moved { index: 1 }
        );
        assert_eq!(
            skip(&mut session, store.as_ref()).await.unwrap(),
            Transition::Finished
        );
        assert_eq!(session.phase(), crate::survey::session::SessionPhase::Completed);
        assert!(!session.progress_mut().is_complete());
        assert!(store.responses().iter().all(|r| r.status == "skipped"));
    }

    #[tokio::test]
    async fn test_login_resumes_prior_progress() {
        let (mut session, auth, store) = ready_session(3).await;
        submit(&mut session, store.as_ref(), &classification())
            .await
            .unwrap();
        skip(&mut session, store.as_ref()).await.unwrap();
        let answered = session.progress().songs()[0].id.clone();
        let skipped = session.progress().songs()[1].id.clone();

        let mut resumed = start_session(store.as_ref()).await.unwrap();
        login(&mut resumed, &auth, "ana@example.com", "pw")
            .await
            .unwrap();

        let progress = resumed.progress();
        let answered_idx = progress.index_of(&answered).unwrap();
        let skipped_idx = progress.index_of(&skipped).unwrap();
        assert_eq!(progress.song_status(answered_idx), SongStatus::Completed);
        assert_eq!(progress.song_status(skipped_idx), SongStatus::Skipped);
        assert_eq!(
            resumed.phase(),
            crate::survey::session::SessionPhase::InProgress,
            "Stored profile carries over so the demographic step is skipped"
        );
    }

    #[tokio::test]
    async fn test_second_sign_in_on_same_session_rejected() {
        let (mut session, auth, store) = ready_session(2).await;
        submit(&mut session, store.as_ref(), &classification())
            .await
            .unwrap();

        let err = register(&mut session, &auth, "bob@example.com", "pw", Profile::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.users().len(), 1, "No account is created for the rejected attempt");

        let err = login(&mut session, &auth, "ana@example.com", "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(session.account().unwrap().email, "ana@example.com");
        assert_eq!(session.progress().progress_stats().completed, 1);
    }

    #[tokio::test]
    async fn test_new_user_after_reset_starts_from_own_history() {
        let (mut session, auth, store) = ready_session(2).await;
        submit(&mut session, store.as_ref(), &classification())
            .await
            .unwrap();

        session.reset();
        register(&mut session, &auth, "bob@example.com", "pw", Profile::default())
            .await
            .unwrap();
        complete_profile(&mut session, &auth, profile_form())
            .await
            .unwrap();

        assert_eq!(session.progress().progress_stats().completed, 0);
        assert_eq!(
            submit(&mut session, store.as_ref(), &classification())
                .await
                .unwrap(),
            Transition::Moved { index: 1 },
            "Bob still has the second song to answer"
        );
        assert_eq!(
            submit(&mut session, store.as_ref(), &classification())
                .await
                .unwrap(),
            Transition::Finished
        );
        let bob = session.account().unwrap().id;
        let bob_rows = store.responses().iter().filter(|r| r.user_id == bob).count();
        assert_eq!(bob_rows, 2);
    }

    #[tokio::test]
    async fn test_previous_and_navigate_bounds() {
        let (mut session, _, _) = ready_session(3).await;
        assert!(previous(&mut session).is_err());

        assert_eq!(navigate(&mut session, 2).unwrap(), 2);
        assert_eq!(previous(&mut session).unwrap(), 1);
        assert!(matches!(
            navigate(&mut session, 3),
            Err(AppError::Validation(_))
        ));
        assert_eq!(session.progress().current_index(), 1);
    }
}
