//! Business logic services

pub mod auth;
pub mod cards;
pub mod lending;
pub mod queries;
pub mod sessions;

use std::sync::Arc;

use chrono::Duration;

use crate::{
    clock::Clock,
    config::{AuthConfig, LendingConfig, MAX_SESSION_TTL_MINUTES},
    error::{AppError, AppResult},
    repository::{CredentialStore, LedgerStore},
};

/// Longest accepted book code
pub const MAX_BOOK_CODE_LENGTH: usize = 64;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub lending: lending::LendingService,
    pub cards: cards::CardService,
    pub queries: queries::QueryService,
    pub auth: auth::AuthService,
}

impl Services {
    /// Wire every service over the same storage and clock
    pub fn new(
        store: Arc<dyn LedgerStore>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        lending_config: &LendingConfig,
        auth_config: &AuthConfig,
    ) -> Self {
        let sessions = Arc::new(sessions::SessionStore::new(Duration::minutes(
            auth_config
                .session_ttl_minutes
                .clamp(1, MAX_SESSION_TTL_MINUTES),
        )));

        Self {
            lending: lending::LendingService::new(
                store.clone(),
                clock.clone(),
                lending::LoanPolicy::from(lending_config),
            ),
            cards: cards::CardService::new(store.clone(), clock.clone()),
            queries: queries::QueryService::new(store, clock.clone()),
            auth: auth::AuthService::new(credentials, sessions, clock),
        }
    }

    /// Readiness probe against the backing store
    pub async fn ping(&self) -> AppResult<()> {
        self.queries.ping().await
    }
}

pub(crate) fn validate_id(name: &str, id: i32) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::Validation(format!("{} must be positive, got {}", name, id)));
    }
    Ok(())
}

pub(crate) fn validate_book_code(book_code: &str) -> AppResult<()> {
    if book_code.trim().is_empty() {
        return Err(AppError::Validation("book_code must not be empty".to_string()));
    }
    if book_code.trim() != book_code {
        return Err(AppError::Validation(
            "book_code must not have leading or trailing whitespace".to_string(),
        ));
    }
    if book_code.chars().count() > MAX_BOOK_CODE_LENGTH {
        return Err(AppError::Validation(format!(
            "book_code must be at most {} characters",
            MAX_BOOK_CODE_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive() {
        assert!(validate_id("loan_id", 1).is_ok());
        assert!(matches!(validate_id("loan_id", 0), Err(AppError::Validation(_))));
        assert!(matches!(validate_id("student_id", -3), Err(AppError::Validation(_))));
    }

    #[test]
    fn book_code_rejects_blank_and_oversized() {
        assert!(validate_book_code("QA76.73").is_ok());
        assert!(validate_book_code("   ").is_err());
        assert!(validate_book_code(" B1").is_err());
        assert!(validate_book_code("B1\n").is_err());
        assert!(validate_book_code(&"x".repeat(MAX_BOOK_CODE_LENGTH + 1)).is_err());
    }
}
