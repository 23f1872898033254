//! Loan models and read-side projections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan record. Open while `return_date` is `None`, closed once it is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub loan_id: i32,
    pub student_id: i32,
    pub copy_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// Overdue is derived, never stored
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < now
    }
}

/// Values for a loan row about to be inserted
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub student_id: i32,
    pub copy_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Desk view of an open loan (overdue list, all open loans)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanSummary {
    pub loan_id: i32,
    pub due_date: DateTime<Utc>,
    pub student_name: String,
    pub book_title: String,
    pub barcode: Option<String>,
}

/// A student's loan with the borrowed book's title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentLoan {
    pub loan_id: i32,
    pub copy_id: i32,
    pub book_code: String,
    pub book_title: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}
