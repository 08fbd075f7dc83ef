use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::errors::AppError;
use crate::models::response::PriorResponse;
use crate::models::user::{Account, NewUser, Profile};
use crate::store::{StoreError, SurveyStore};

pub const GENDER_OPTIONS: &[&str] = &["male", "female", "other", "prefer_not_to_say"];
pub const MIN_AGE: i32 = 13;
pub const MAX_AGE: i32 = 100;

/// Password accounts plus read access to a user's stored answers.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn SurveyStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn SurveyStore>) -> Self {
        AuthService { store }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: Profile,
    ) -> Result<Account, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        if !is_well_formed_email(&email) {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        validate_profile_fields(&profile)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash,
                profile,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration for the same email.
                StoreError::UniqueViolation => {
                    AppError::Conflict("Email is already registered".to_string())
                }
                other => other.into(),
            })?;

        info!("Registered user {}", user.id);
        Ok(Account::from(&user))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AppError> {
        let email = normalize_email(email);
        let mut user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AppError::NotFound)?;

        if !user.is_active {
            return Err(AppError::InactiveAccount);
        }

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        self.store.record_login(user.id, now).await?;
        user.last_login_at = Some(now);

        info!("User {} signed in", user.id);
        Ok(Account::from(&user))
    }

    /// Song ids the user has already answered. Empty on any failure.
    #[allow(dead_code)]
    pub async fn prior_responses(&self, user_id: Uuid) -> HashSet<String> {
        self.prior_history(user_id)
            .await
            .into_iter()
            .map(|r| r.song_id)
            .collect()
    }

    /// The user's stored (song, status) pairs. Empty on any failure.
    pub async fn prior_history(&self, user_id: Uuid) -> Vec<PriorResponse> {
        match self.store.responses_for_user(user_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!("Could not load prior responses for user {user_id}: {e}");
                Vec::new()
            }
        }
    }

    /// Best-effort: the session keeps the profile even if this write fails.
    pub async fn update_profile(&self, user_id: Uuid, profile: &Profile) -> bool {
        match self.store.update_profile(user_id, profile).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not persist profile for user {user_id}: {e}");
                false
            }
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Requires a non-empty local part and a dotted domain after the last `@`.
pub fn is_well_formed_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Optional fields are only checked when present.
pub fn validate_profile_fields(profile: &Profile) -> Result<(), AppError> {
    if let Some(gender) = profile.gender.as_deref() {
        if !GENDER_OPTIONS.contains(&gender) {
            return Err(AppError::Validation(format!(
                "Gender must be one of: {}",
                GENDER_OPTIONS.join(", ")
            )));
        }
    }
    if let Some(age) = profile.age {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(AppError::Validation(format!(
                "Age must be between {MIN_AGE} and {MAX_AGE}"
            )));
        }
    }
    Ok(())
}
