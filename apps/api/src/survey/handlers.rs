use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::response::Classification;
use crate::models::user::Profile;
use crate::state::AppState;
use crate::survey::actions::{self, ProfileForm, Transition};
use crate::survey::session::{SessionView, SongListEntry};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    pub index: usize,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub transition: Transition,
    pub session: SessionView,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let session = actions::start_session(state.store.as_ref()).await?;
    let shared = state.sessions.insert(session).await;
    let view = shared.lock().await.view(state.session_timeout());
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id).await?;
    let view = shared.lock().await.view(state.session_timeout());
    Ok(Json(view))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(id).await {
        return Err(AppError::SessionNotFound(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/songs
pub async fn handle_list_songs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SongListEntry>>, AppError> {
    let shared = state.sessions.get(id).await?;
    let songs = shared.lock().await.song_list();
    Ok(Json(songs))
}

/// POST /api/v1/sessions/:id/register
pub async fn handle_register(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    let profile = Profile {
        gender: req.gender,
        age: req.age,
    };
    actions::register(&mut session, &state.auth, &req.email, &req.password, profile).await?;
    Ok((StatusCode::CREATED, Json(session.view(state.session_timeout()))))
}

/// POST /api/v1/sessions/:id/login
pub async fn handle_login(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    actions::login(&mut session, &state.auth, &req.email, &req.password).await?;
    Ok(Json(session.view(state.session_timeout())))
}

/// POST /api/v1/sessions/:id/profile
pub async fn handle_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    actions::complete_profile(&mut session, &state.auth, form).await?;
    Ok(Json(session.view(state.session_timeout())))
}

/// POST /api/v1/sessions/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(classification): Json<Classification>,
) -> Result<Json<AnswerResponse>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    let transition = actions::submit(&mut session, state.store.as_ref(), &classification).await?;
    Ok(Json(AnswerResponse {
        transition,
        session: session.view(state.session_timeout()),
    }))
}

/// POST /api/v1/sessions/:id/skip
pub async fn handle_skip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnswerResponse>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    let transition = actions::skip(&mut session, state.store.as_ref()).await?;
    Ok(Json(AnswerResponse {
        transition,
        session: session.view(state.session_timeout()),
    }))
}

/// POST /api/v1/sessions/:id/previous
pub async fn handle_previous(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    actions::previous(&mut session)?;
    Ok(Json(session.view(state.session_timeout())))
}

/// POST /api/v1/sessions/:id/navigate
pub async fn handle_navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    actions::navigate(&mut session, req.index)?;
    Ok(Json(session.view(state.session_timeout())))
}

/// POST /api/v1/sessions/:id/reset
/// Also serves as sign-out: identity and progress go, the song order stays.
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    session.reset();
    Ok(Json(session.view(state.session_timeout())))
}
