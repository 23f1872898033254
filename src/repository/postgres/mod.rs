//! Postgres-backed ledger storage

mod cards;
mod credentials;
mod inventory;
mod loans;
mod students;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::{CredentialStore, LedgerStore, LedgerTx};
use crate::{
    error::AppResult,
    models::{
        AvailableBook, BookCopy, Credential, LibraryCard, Loan, LoanSummary, NewLoan,
        StudentLoan, StudentProfile,
    },
};

/// Main store holding the database connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Read-committed transaction; sqlx rolls it back when dropped uncommitted
struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_card(&mut self, student_id: i32) -> AppResult<Option<LibraryCard>> {
        cards::lock(&mut self.tx, student_id).await
    }

    async fn update_card(
        &mut self,
        student_id: i32,
        is_active: bool,
        activation_date: DateTime<Utc>,
    ) -> AppResult<LibraryCard> {
        cards::update(&mut self.tx, student_id, is_active, activation_date).await
    }

    async fn reserve_copy(&mut self, book_code: &str) -> AppResult<i32> {
        inventory::reserve_copy(&mut self.tx, book_code).await
    }

    async fn release_copy(&mut self, copy_id: i32) -> AppResult<()> {
        inventory::release_copy(&mut self.tx, copy_id).await
    }

    async fn insert_loan(&mut self, loan: NewLoan) -> AppResult<Loan> {
        loans::insert(&mut self.tx, &loan).await
    }

    async fn lock_loan(&mut self, loan_id: i32) -> AppResult<Option<Loan>> {
        loans::lock(&mut self.tx, loan_id).await
    }

    async fn close_loan(&mut self, loan_id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        loans::close(&mut self.tx, loan_id, returned_at).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn card(&self, student_id: i32) -> AppResult<Option<LibraryCard>> {
        cards::get(&self.pool, student_id).await
    }

    async fn student_exists(&self, student_id: i32) -> AppResult<bool> {
        students::exists(&self.pool, student_id).await
    }

    async fn available_copy_count(&self, book_code: &str) -> AppResult<i64> {
        inventory::available_copy_count(&self.pool, book_code).await
    }

    async fn book_copies(&self, book_code: &str) -> AppResult<Vec<BookCopy>> {
        inventory::book_copies(&self.pool, book_code).await
    }

    async fn available_books(&self) -> AppResult<Vec<AvailableBook>> {
        inventory::available_books(&self.pool).await
    }

    async fn overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<LoanSummary>> {
        loans::overdue(&self.pool, now).await
    }

    async fn all_open_loans(&self) -> AppResult<Vec<LoanSummary>> {
        loans::all_open(&self.pool).await
    }

    async fn open_loans(&self, student_id: i32) -> AppResult<Vec<StudentLoan>> {
        loans::open_for_student(&self.pool, student_id).await
    }

    async fn loan_history(&self, student_id: i32) -> AppResult<Vec<StudentLoan>> {
        loans::history_for_student(&self.pool, student_id).await
    }

    async fn student_profile(&self, student_id: i32) -> AppResult<Option<StudentProfile>> {
        students::profile(&self.pool, student_id).await
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_credential(&self, username: &str) -> AppResult<Option<Credential>> {
        credentials::find(&self.pool, username).await
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> AppResult<bool> {
        credentials::update_password_hash(&self.pool, username, password_hash).await
    }
}
