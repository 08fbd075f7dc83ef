use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string; salt and parameters are embedded.
    pub password_hash: String,
    pub gender: Option<String>,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Demographic attributes collected once per participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub gender: Option<String>,
    pub age: Option<i32>,
}

impl Profile {
    pub fn is_complete(&self) -> bool {
        self.gender.is_some() && self.age.is_some()
    }
}

/// The public view of a user. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for Account {
    fn from(user: &User) -> Self {
        Account {
            id: user.id,
            email: user.email.clone(),
            profile: Profile {
                gender: user.gender.clone(),
                age: user.age,
            },
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Insert payload for a freshly registered user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub profile: Profile,
}
