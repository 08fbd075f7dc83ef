use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::survey::session::SurveySession;

pub type SharedSession = Arc<Mutex<SurveySession>>;

/// Live sessions keyed by id. Each session sits behind its own mutex so
/// actions on one participant serialize without blocking anyone else.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: SurveySession) -> SharedSession {
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::SessionNotFound(id))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions with no activity for longer than `max_idle`.
    /// Sessions locked by an in-flight request are kept.
    pub async fn purge_idle(&self, max_idle: Duration) -> usize {
        self.purge_idle_at(Utc::now(), max_idle).await
    }

    pub async fn purge_idle_at(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, shared| match shared.try_lock() {
            Ok(session) => !session.progress().is_expired_at(now, max_idle),
            Err(_) => true,
        });
        before - sessions.len()
    }
}

/// Periodically purges sessions idle for longer than `retention`.
pub fn spawn_idle_sweeper(
    registry: SessionRegistry,
    retention: Duration,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = registry.purge_idle(retention).await;
            if removed > 0 {
                info!(
                    "Purged {removed} idle sessions, {} still active",
                    registry.len().await
                );
            } else {
                debug!("Session sweep found nothing to purge");
            }
        }
    })
}
