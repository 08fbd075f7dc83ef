//! Argon2 password hashing. The PHC string produced here embeds the salt
//! and parameters, so only the hash column is stored.

use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::AppError;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|err| anyhow!("password hashing failed: {err}"))?;
    Ok(hash.to_string())
}

/// A malformed stored hash verifies as false rather than erroring.
pub fn verify_password(plain: &str, phc_hash: &str) -> bool {
    match PasswordHash::new(phc_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// Argon2 is deliberately slow, so both directions run on the blocking pool.

pub async fn hash_password_blocking(plain: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| AppError::Internal(anyhow!("hashing task failed: {e}")))?
        .map_err(AppError::Internal)
}

pub async fn verify_password_blocking(plain: String, phc_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &phc_hash))
        .await
        .map_err(|e| AppError::Internal(anyhow!("verification task failed: {e}")))
}
