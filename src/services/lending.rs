//! Lending ledger: the assign/return state machine.
//!
//! Each operation runs in exactly one storage transaction. Every early return
//! drops the transaction uncommitted, so a failure after the copy reservation
//! never leaves the copy marked as lent.

use std::sync::Arc;

use chrono::Duration;

use super::{validate_book_code, validate_id};
use crate::{
    clock::Clock,
    config::{LendingConfig, MAX_LOAN_PERIOD_DAYS},
    error::{AppError, AppResult, LedgerError},
    models::{Loan, NewLoan},
    repository::LedgerStore,
};

/// Lending rules applied at loan creation
#[derive(Debug, Clone, Copy)]
pub struct LoanPolicy {
    pub loan_period: Duration,
}

impl From<&LendingConfig> for LoanPolicy {
    fn from(config: &LendingConfig) -> Self {
        Self {
            loan_period: Duration::days(config.loan_period_days.clamp(1, MAX_LOAN_PERIOD_DAYS)),
        }
    }
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self::from(&LendingConfig::default())
    }
}

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    policy: LoanPolicy,
}

impl LendingService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, policy: LoanPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> LoanPolicy {
        self.policy
    }

    /// Lend one available copy of `book_code` to a student with an active card.
    ///
    /// Order matters: card check, then reservation, then insert. A refused card
    /// never touches inventory.
    pub async fn assign_loan(&self, student_id: i32, book_code: &str) -> AppResult<Loan> {
        validate_id("student_id", student_id)?;
        validate_book_code(book_code)?;

        let mut tx = self.store.begin().await?;

        match tx.lock_card(student_id).await? {
            Some(card) if card.is_active => {}
            _ => return Err(LedgerError::CardNotActive(student_id).into()),
        }

        let copy_id = tx.reserve_copy(book_code).await?;

        let loan_date = self.clock.now();
        let due_date = loan_date
            .checked_add_signed(self.policy.loan_period)
            .ok_or_else(|| AppError::Internal("Loan due date out of range".to_string()))?;
        let loan = tx
            .insert_loan(NewLoan {
                student_id,
                copy_id,
                loan_date,
                due_date,
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.loan_id,
            student_id,
            copy_id,
            book_code,
            due_date = %loan.due_date,
            "Loan assigned"
        );
        Ok(loan)
    }

    /// Close an open loan and put its copy back on the shelf.
    ///
    /// A second return of the same loan is rejected with `AlreadyReturned`.
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<Loan> {
        validate_id("loan_id", loan_id)?;

        let mut tx = self.store.begin().await?;

        let loan = tx
            .lock_loan(loan_id)
            .await?
            .ok_or(LedgerError::LoanNotFound(loan_id))?;

        if loan.return_date.is_some() {
            return Err(LedgerError::AlreadyReturned(loan_id).into());
        }

        // return_date never precedes loan_date, even if the clock stepped back
        let returned_at = self.clock.now().max(loan.loan_date);
        let closed = tx.close_loan(loan_id, returned_at).await?;
        tx.release_copy(closed.copy_id).await?;

        tx.commit().await?;

        tracing::info!(
            loan_id,
            student_id = closed.student_id,
            copy_id = closed.copy_id,
            "Loan returned"
        );
        Ok(closed)
    }
}
