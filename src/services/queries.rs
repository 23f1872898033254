//! Read-only views over the ledger and inventory

use std::sync::Arc;

use super::{validate_book_code, validate_id};
use crate::{
    clock::Clock,
    error::{AppResult, LedgerError},
    models::{AvailableBook, BookCopy, LoanSummary, StudentLoan, StudentProfile},
    repository::LedgerStore,
};

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl QueryService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    /// Open loans whose due date has passed, earliest first
    pub async fn list_overdue(&self) -> AppResult<Vec<LoanSummary>> {
        self.store.overdue_loans(self.clock.now()).await
    }

    pub async fn list_all_open_loans(&self) -> AppResult<Vec<LoanSummary>> {
        self.store.all_open_loans().await
    }

    pub async fn list_open_loans(&self, student_id: i32) -> AppResult<Vec<StudentLoan>> {
        self.ensure_student(student_id).await?;
        self.store.open_loans(student_id).await
    }

    /// Every loan of a student, returned ones included, newest first
    pub async fn loan_history(&self, student_id: i32) -> AppResult<Vec<StudentLoan>> {
        self.ensure_student(student_id).await?;
        self.store.loan_history(student_id).await
    }

    pub async fn student_profile(&self, student_id: i32) -> AppResult<StudentProfile> {
        validate_id("student_id", student_id)?;
        self.store
            .student_profile(student_id)
            .await?
            .ok_or_else(|| LedgerError::StudentNotFound(student_id).into())
    }

    pub async fn available_books(&self) -> AppResult<Vec<AvailableBook>> {
        self.store.available_books().await
    }

    pub async fn book_copies(&self, book_code: &str) -> AppResult<Vec<BookCopy>> {
        validate_book_code(book_code)?;
        self.store.book_copies(book_code).await
    }

    pub async fn available_copy_count(&self, book_code: &str) -> AppResult<i64> {
        validate_book_code(book_code)?;
        self.store.available_copy_count(book_code).await
    }

    async fn ensure_student(&self, student_id: i32) -> AppResult<()> {
        validate_id("student_id", student_id)?;
        if !self.store.student_exists(student_id).await? {
            return Err(LedgerError::StudentNotFound(student_id).into());
        }
        Ok(())
    }
}
