//! Error types for the lending ledger

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchStudent = 4,
    NoSuchLoan = 5,
    NoSuchCopy = 6,
    NoSuchCard = 7,
    CardNotActive = 8,
    NoAvailableCopy = 9,
    AlreadyReturned = 10,
    BadValue = 11,
}

/// Coarse classification used by callers and the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Unauthorized,
    Forbidden,
    Internal,
}

/// Failures of the ledger state machine itself.
///
/// These are expected outcomes of concurrent or mistaken requests; none of
/// them leaves a partially applied write behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Student {0} not found")]
    StudentNotFound(i32),

    #[error("Student {0} has no library card")]
    CardNotFound(i32),

    #[error("Loan {0} not found")]
    LoanNotFound(i32),

    #[error("Copy {0} not found")]
    UnknownCopy(i32),

    #[error("Library card of student {0} is not active")]
    CardNotActive(i32),

    #[error("No available copy of book {0}")]
    NoAvailableCopy(String),

    #[error("Loan {0} has already been returned")]
    AlreadyReturned(i32),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::StudentNotFound(_)
            | LedgerError::CardNotFound(_)
            | LedgerError::LoanNotFound(_)
            | LedgerError::UnknownCopy(_) => ErrorKind::NotFound,
            LedgerError::CardNotActive(_)
            | LedgerError::NoAvailableCopy(_)
            | LedgerError::AlreadyReturned(_) => ErrorKind::Conflict,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::StudentNotFound(_) => ErrorCode::NoSuchStudent,
            LedgerError::CardNotFound(_) => ErrorCode::NoSuchCard,
            LedgerError::LoanNotFound(_) => ErrorCode::NoSuchLoan,
            LedgerError::UnknownCopy(_) => ErrorCode::NoSuchCopy,
            LedgerError::CardNotActive(_) => ErrorCode::CardNotActive,
            LedgerError::NoAvailableCopy(_) => ErrorCode::NoAvailableCopy,
            LedgerError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Authentication(_) => ErrorKind::Unauthorized,
            AppError::Authorization(_) => ErrorKind::Forbidden,
            AppError::Validation(_) => ErrorKind::InvalidInput,
            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Internal,
            AppError::Ledger(e) => e.kind(),
        }
    }

    /// The ledger failure carried by this error, if any
    pub fn ledger(&self) -> Option<&LedgerError> {
        match self {
            AppError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Ledger(e) => {
                tracing::debug!(error = %e, "Ledger request rejected");
                let status = match e.kind() {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::CONFLICT,
                };
                (status, e.code(), e.to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_taxonomy() {
        assert_eq!(LedgerError::LoanNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::CardNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::AlreadyReturned(1).kind(), ErrorKind::Conflict);
        assert_eq!(
            LedgerError::NoAvailableCopy("B1".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(LedgerError::CardNotActive(3).kind(), ErrorKind::Conflict);
    }

    #[test]
    fn status_codes_follow_kind() {
        let cases = [
            (AppError::from(LedgerError::LoanNotFound(9)), StatusCode::NOT_FOUND),
            (AppError::from(LedgerError::AlreadyReturned(9)), StatusCode::CONFLICT),
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Authentication("no".into()), StatusCode::UNAUTHORIZED),
            (AppError::Authorization("no".into()), StatusCode::FORBIDDEN),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn ledger_accessor_only_matches_ledger_errors() {
        let err = AppError::from(LedgerError::CardNotActive(4));
        assert_eq!(err.ledger(), Some(&LedgerError::CardNotActive(4)));
        assert!(AppError::Internal("x".into()).ledger().is_none());
    }
}
