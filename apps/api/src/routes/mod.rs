pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::survey::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route("/api/v1/sessions/:id/songs", get(handlers::handle_list_songs))
        // Identity
        .route("/api/v1/sessions/:id/register", post(handlers::handle_register))
        .route("/api/v1/sessions/:id/login", post(handlers::handle_login))
        .route("/api/v1/sessions/:id/profile", post(handlers::handle_profile))
        // Answers and navigation
        .route("/api/v1/sessions/:id/submit", post(handlers::handle_submit))
        .route("/api/v1/sessions/:id/skip", post(handlers::handle_skip))
        .route("/api/v1/sessions/:id/previous", post(handlers::handle_previous))
        .route("/api/v1/sessions/:id/navigate", post(handlers::handle_navigate))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, TableNames};
    use crate::store::memory::{sample_songs, MemoryStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            database_name: None,
            tables: TableNames::default(),
            port: 0,
            session_timeout_minutes: 30,
            session_retention_minutes: 240,
            rust_log: "info".to_string(),
        }
    }

    fn app(store: MemoryStore) -> Router {
        build_router(AppState::new(Arc::new(store), test_config()))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_song_count() {
        let app = app(MemoryStore::with_songs(sample_songs(4)));
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["eligible_songs"], 4);
        assert_eq!(body["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_signed_in_session_rejects_second_account() {
        let app = app(MemoryStore::with_songs(sample_songs(2)));
        let (_, created) = call(&app, Method::POST, "/api/v1/sessions", None).await;
        let id = created["session_id"].as_str().unwrap().to_string();
        let base = format!("/api/v1/sessions/{id}");

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("{base}/register"),
            Some(json!({ "email": "ana@example.com", "password": "secret12" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("{base}/register"),
            Some(json!({ "email": "bob@example.com", "password": "secret34" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (status, _) = call(&app, Method::POST, &format!("{base}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, view) = call(
            &app,
            Method::POST,
            &format!("{base}/register"),
            Some(json!({ "email": "bob@example.com", "password": "secret34" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["account"]["email"], "bob@example.com");
        assert_eq!(view["stats"]["completed"], 0);
    }

    #[tokio::test]
    async fn test_health_degraded_without_songs() {
        let app = app(MemoryStore::default());
        let (status, _) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_create_session_without_songs_is_unavailable() {
        let app = app(MemoryStore::default());
        let (status, body) = call(&app, Method::POST, "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "NO_ELIGIBLE_SONGS");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app(MemoryStore::with_songs(sample_songs(2)));
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_requires_sign_in() {
        let app = app(MemoryStore::with_songs(sample_songs(2)));
        let (_, created) = call(&app, Method::POST, "/api/v1/sessions", None).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/submit"),
            Some(json!({ "explicit_content": "yes" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "AUTHENTICATION_REQUIRED");
    }

    #[tokio::test]
    async fn test_full_participant_flow() {
        let app = app(MemoryStore::with_songs(sample_songs(2)));

        let (status, created) = call(&app, Method::POST, "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["phase"], "awaiting_auth");
        let id = created["session_id"].as_str().unwrap().to_string();
        let base = format!("/api/v1/sessions/{id}");

        let (status, view) = call(
            &app,
            Method::POST,
            &format!("{base}/register"),
            Some(json!({ "email": "Ana@Example.com", "password": "secret12" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["phase"], "awaiting_profile");

        let (status, view) = call(
            &app,
            Method::POST,
            &format!("{base}/profile"),
            Some(json!({ "gender": "female", "age": 24, "terms_accepted": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["phase"], "in_progress");

        let (status, answered) = call(
            &app,
            Method::POST,
            &format!("{base}/submit"),
            Some(json!({
                "explicit_content": "no",
                "sexual_content": "no",
                "confidence_level": "very_sure",
                "comments": "clean lyrics"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answered["transition"]["outcome"], "moved");
        assert_eq!(answered["transition"]["index"], 1);

        let (status, answered) = call(&app, Method::POST, &format!("{base}/skip"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answered["transition"]["outcome"], "finished");
        assert_eq!(answered["session"]["phase"], "completed");
        assert_eq!(answered["session"]["stats"]["completed"], 1);
        assert_eq!(answered["session"]["stats"]["skipped"], 1);
        assert_eq!(answered["session"]["stats"]["remaining"], 0);

        let (_, songs) = call(&app, Method::GET, &format!("{base}/songs"), None).await;
        assert_eq!(songs.as_array().unwrap().len(), 2);

        let (status, _) = call(&app, Method::DELETE, &base, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_navigate_out_of_range_is_rejected() {
        let app = app(MemoryStore::with_songs(sample_songs(2)));
        let (_, created) = call(&app, Method::POST, "/api/v1/sessions", None).await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/navigate"),
            Some(json!({ "index": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, view) = call(
            &app,
            Method::POST,
            &format!("/api/v1/sessions/{id}/navigate"),
            Some(json!({ "index": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["current_index"], 1);
    }
}
