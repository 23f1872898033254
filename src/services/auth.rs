//! Credential verification and session gateway

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::sessions::SessionStore;
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::Identity,
    repository::CredentialStore,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    /// Verified against when the username is unknown, so both failures cost one Argon2 run
    dummy_hash: Option<Arc<str>>,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dummy_hash = hash_password("not-a-real-password")
            .map(Arc::from)
            .map_err(|e| tracing::warn!("Failed to prepare dummy password hash: {}", e))
            .ok();

        Self {
            credentials,
            sessions,
            clock,
            dummy_hash,
        }
    }

    /// Verify a username/password pair and open a session
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, Identity)> {
        let Some(credential) = self.credentials.find_credential(username).await? else {
            if let Some(hash) = &self.dummy_hash {
                verify_password(hash, password)?;
            }
            return Err(invalid_credentials());
        };

        if !verify_password(&credential.password_hash, password)? {
            return Err(invalid_credentials());
        }

        let identity = credential.identity();
        let token = self.sessions.issue(identity.clone(), self.clock.now())?;

        tracing::info!(username = %identity.username, role = %identity.role, "Session opened");
        Ok((token, identity))
    }

    /// Resolve a bearer token to the caller it was issued to
    pub fn authorize(&self, token: &str) -> AppResult<Identity> {
        self.sessions
            .resolve(token, self.clock.now())
            .ok_or_else(|| AppError::Authentication("Invalid or expired session".to_string()))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    pub async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let credential = self
            .credentials
            .find_credential(&identity.username)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(&credential.password_hash, current_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let hash = hash_password(new_password)?;
        if !self
            .credentials
            .update_password_hash(&credential.username, &hash)
            .await?
        {
            return Err(invalid_credentials());
        }

        tracing::info!(username = %credential.username, "Password changed");
        Ok(())
    }

    pub fn purge_expired_sessions(&self) -> usize {
        self.sessions.purge_expired(self.clock.now())
    }
}

fn invalid_credentials() -> AppError {
    AppError::Authentication("Invalid username or password".to_string())
}

/// Hash a password using Argon2 with a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
