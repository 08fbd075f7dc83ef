use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

/// GET /health
/// Reports service version and whether the study has songs to serve.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.count_eligible_songs().await {
        Ok(count) if count > 0 => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "service": "survey-api",
                "eligible_songs": count,
                "active_sessions": state.sessions.len().await
            })),
        ),
        Ok(_) => {
            warn!("Health check: no eligible songs (spotify_found AND is_human_study)");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "reason": "no eligible songs",
                    "eligible_songs": 0
                })),
            )
        }
        Err(e) => {
            warn!("Health check: database unavailable: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "reason": "database unreachable"
                })),
            )
        }
    }
}
