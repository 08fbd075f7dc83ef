use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Config;
use crate::store::SurveyStore;
use crate::survey::registry::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one database handle, built at startup and shared by every component.
    pub store: Arc<dyn SurveyStore>,
    pub auth: AuthService,
    pub sessions: SessionRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn SurveyStore>, config: Config) -> Self {
        AppState {
            auth: AuthService::new(store.clone()),
            store,
            sessions: SessionRegistry::new(),
            config,
        }
    }

    /// Inactivity window after which a session is reported as expired.
    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.config.session_timeout_minutes)
    }

    /// Idle time after which a session is removed from the registry.
    pub fn session_retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.config.session_retention_minutes)
    }
}
