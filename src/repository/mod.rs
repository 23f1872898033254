//! Storage layer for the ledger.
//!
//! Mutations go through a [`LedgerTx`] obtained from [`LedgerStore::begin`].
//! A transaction publishes its writes only on [`LedgerTx::commit`]; dropping it
//! without committing rolls everything back. Reads that need no transaction
//! live directly on [`LedgerStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        AvailableBook, BookCopy, Credential, LibraryCard, Loan, LoanSummary, NewLoan,
        StudentLoan, StudentProfile,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One unit of atomicity over cards, inventory and loans
#[async_trait]
pub trait LedgerTx: Send {
    /// Card of a student, locked against concurrent toggles until commit
    async fn lock_card(&mut self, student_id: i32) -> AppResult<Option<LibraryCard>>;

    async fn update_card(
        &mut self,
        student_id: i32,
        is_active: bool,
        activation_date: DateTime<Utc>,
    ) -> AppResult<LibraryCard>;

    /// Marks the lowest available copy of `book_code` as lent.
    ///
    /// Fails with `NoAvailableCopy` when no copy is free or another
    /// transaction won the conditional update.
    async fn reserve_copy(&mut self, book_code: &str) -> AppResult<i32>;

    /// Puts a copy back on the shelf; `UnknownCopy` if it does not exist
    async fn release_copy(&mut self, copy_id: i32) -> AppResult<()>;

    async fn insert_loan(&mut self, loan: NewLoan) -> AppResult<Loan>;

    /// Loan row, locked until commit
    async fn lock_loan(&mut self, loan_id: i32) -> AppResult<Option<Loan>>;

    /// Sets the return date of an open loan; `AlreadyReturned` otherwise
    async fn close_loan(&mut self, loan_id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Transactional ledger storage plus its read-only queries
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;

    /// Storage liveness probe for readiness checks
    async fn ping(&self) -> AppResult<()>;

    async fn card(&self, student_id: i32) -> AppResult<Option<LibraryCard>>;

    async fn student_exists(&self, student_id: i32) -> AppResult<bool>;

    async fn available_copy_count(&self, book_code: &str) -> AppResult<i64>;

    async fn book_copies(&self, book_code: &str) -> AppResult<Vec<BookCopy>>;

    async fn available_books(&self) -> AppResult<Vec<AvailableBook>>;

    /// Open loans due strictly before `now`, earliest due date first
    async fn overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<LoanSummary>>;

    async fn all_open_loans(&self) -> AppResult<Vec<LoanSummary>>;

    async fn open_loans(&self, student_id: i32) -> AppResult<Vec<StudentLoan>>;

    async fn loan_history(&self, student_id: i32) -> AppResult<Vec<StudentLoan>>;

    /// Identity and loan counters from a single consistent read
    async fn student_profile(&self, student_id: i32) -> AppResult<Option<StudentProfile>>;
}

/// Credential lookups for the session gateway
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_credential(&self, username: &str) -> AppResult<Option<Credential>>;

    /// Returns false when the username does not exist
    async fn update_password_hash(&self, username: &str, password_hash: &str) -> AppResult<bool>;
}
