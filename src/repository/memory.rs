//! In-process ledger storage.
//!
//! A transaction holds the store's mutex for its whole lifetime and works on a
//! staged clone of the state; commit swaps the clone in, drop discards it.
//! Transactions are therefore fully serialized, which is stronger than the
//! isolation the Postgres backend provides.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{CredentialStore, LedgerStore, LedgerTx};
use crate::{
    clock::{Clock, SystemClock},
    error::{AppError, AppResult, LedgerError},
    models::{
        AvailableBook, Book, BookCopy, Credential, LibraryCard, Loan, LoanSummary, NewLoan,
        Role, Student, StudentLoan, StudentProfile,
    },
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    students: BTreeMap<i32, Student>,
    cards: BTreeMap<i32, LibraryCard>,
    books: BTreeMap<String, Book>,
    copies: BTreeMap<i32, BookCopy>,
    loans: BTreeMap<i32, Loan>,
    /// Keyed by lowercase username
    credentials: BTreeMap<String, Credential>,
    last_student_id: i32,
    last_copy_id: i32,
    last_loan_id: i32,
    last_credential_id: i32,
}

impl MemoryState {
    fn summary(&self, loan: &Loan) -> Option<LoanSummary> {
        let student = self.students.get(&loan.student_id)?;
        let copy = self.copies.get(&loan.copy_id)?;
        let book = self.books.get(&copy.book_code)?;
        Some(LoanSummary {
            loan_id: loan.loan_id,
            due_date: loan.due_date,
            student_name: student.full_name(),
            book_title: book.title.clone(),
            barcode: copy.barcode.clone(),
        })
    }

    fn student_loan(&self, loan: &Loan) -> Option<StudentLoan> {
        let copy = self.copies.get(&loan.copy_id)?;
        let book = self.books.get(&copy.book_code)?;
        Some(StudentLoan {
            loan_id: loan.loan_id,
            copy_id: loan.copy_id,
            book_code: copy.book_code.clone(),
            book_title: book.title.clone(),
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
        })
    }
}

/// Ledger storage kept in process memory
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    /// Stamps card activation dates of seeded students
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock,
        }
    }

    /// Registers a student together with an active library card
    pub async fn add_student(&self, first_name: &str, last_name: &str, email: &str) -> i32 {
        let student_id = self.add_student_without_card(first_name, last_name, email).await;
        let activation_date = self.clock.now();
        let mut state = self.state.lock().await;
        state.cards.insert(
            student_id,
            LibraryCard {
                student_id,
                is_active: true,
                activation_date,
            },
        );
        student_id
    }

    pub async fn add_student_without_card(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> i32 {
        let mut state = self.state.lock().await;
        state.last_student_id += 1;
        let student_id = state.last_student_id;
        state.students.insert(
            student_id,
            Student {
                student_id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                phone: None,
                postal_address: None,
            },
        );
        student_id
    }

    pub async fn add_book(&self, book_code: &str, title: &str) {
        let mut state = self.state.lock().await;
        state.books.insert(
            book_code.to_string(),
            Book {
                book_code: book_code.to_string(),
                title: title.to_string(),
            },
        );
    }

    /// Adds an available copy and returns its id
    pub async fn add_copy(&self, book_code: &str, barcode: &str) -> i32 {
        let mut state = self.state.lock().await;
        state.last_copy_id += 1;
        let copy_id = state.last_copy_id;
        state.copies.insert(
            copy_id,
            BookCopy {
                copy_id,
                book_code: book_code.to_string(),
                rack_number: None,
                barcode: Some(barcode.to_string()),
                price: None,
                purchase_date: None,
                is_available: true,
            },
        );
        copy_id
    }

    pub async fn add_credential(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        student_id: Option<i32>,
    ) {
        let mut state = self.state.lock().await;
        state.last_credential_id += 1;
        let credential = Credential {
            credential_id: state.last_credential_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            student_id,
        };
        state
            .credentials
            .insert(username.to_lowercase(), credential);
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_card(&mut self, student_id: i32) -> AppResult<Option<LibraryCard>> {
        Ok(self.staged.cards.get(&student_id).cloned())
    }

    async fn update_card(
        &mut self,
        student_id: i32,
        is_active: bool,
        activation_date: DateTime<Utc>,
    ) -> AppResult<LibraryCard> {
        let card = self
            .staged
            .cards
            .get_mut(&student_id)
            .ok_or(LedgerError::CardNotFound(student_id))?;
        card.is_active = is_active;
        card.activation_date = activation_date;
        Ok(card.clone())
    }

    async fn reserve_copy(&mut self, book_code: &str) -> AppResult<i32> {
        let copy = self
            .staged
            .copies
            .values_mut()
            .find(|c| c.book_code == book_code && c.is_available)
            .ok_or_else(|| LedgerError::NoAvailableCopy(book_code.to_string()))?;
        copy.is_available = false;
        Ok(copy.copy_id)
    }

    async fn release_copy(&mut self, copy_id: i32) -> AppResult<()> {
        let copy = self
            .staged
            .copies
            .get_mut(&copy_id)
            .ok_or(LedgerError::UnknownCopy(copy_id))?;
        copy.is_available = true;
        Ok(())
    }

    async fn insert_loan(&mut self, loan: NewLoan) -> AppResult<Loan> {
        // Same guarantee as the partial unique index on loans(copy_id)
        if self
            .staged
            .loans
            .values()
            .any(|l| l.copy_id == loan.copy_id && l.is_open())
        {
            return Err(AppError::Internal(format!(
                "copy {} already has an open loan",
                loan.copy_id
            )));
        }

        self.staged.last_loan_id += 1;
        let loan = Loan {
            loan_id: self.staged.last_loan_id,
            student_id: loan.student_id,
            copy_id: loan.copy_id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: None,
        };
        self.staged.loans.insert(loan.loan_id, loan.clone());
        Ok(loan)
    }

    async fn lock_loan(&mut self, loan_id: i32) -> AppResult<Option<Loan>> {
        Ok(self.staged.loans.get(&loan_id).cloned())
    }

    async fn close_loan(&mut self, loan_id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        let loan = self
            .staged
            .loans
            .get_mut(&loan_id)
            .ok_or(LedgerError::LoanNotFound(loan_id))?;
        if loan.return_date.is_some() {
            return Err(LedgerError::AlreadyReturned(loan_id).into());
        }
        loan.return_date = Some(returned_at);
        Ok(loan.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn card(&self, student_id: i32) -> AppResult<Option<LibraryCard>> {
        Ok(self.state.lock().await.cards.get(&student_id).cloned())
    }

    async fn student_exists(&self, student_id: i32) -> AppResult<bool> {
        Ok(self.state.lock().await.students.contains_key(&student_id))
    }

    async fn available_copy_count(&self, book_code: &str) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state
            .copies
            .values()
            .filter(|c| c.book_code == book_code && c.is_available)
            .count() as i64)
    }

    async fn book_copies(&self, book_code: &str) -> AppResult<Vec<BookCopy>> {
        let state = self.state.lock().await;
        Ok(state
            .copies
            .values()
            .filter(|c| c.book_code == book_code)
            .cloned()
            .collect())
    }

    async fn available_books(&self) -> AppResult<Vec<AvailableBook>> {
        let state = self.state.lock().await;
        let mut books: Vec<AvailableBook> = state
            .books
            .values()
            .filter_map(|book| {
                let available_copies = state
                    .copies
                    .values()
                    .filter(|c| c.book_code == book.book_code && c.is_available)
                    .count() as i64;
                (available_copies > 0).then(|| AvailableBook {
                    book_code: book.book_code.clone(),
                    title: book.title.clone(),
                    available_copies,
                })
            })
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.book_code.cmp(&b.book_code)));
        Ok(books)
    }

    async fn overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<LoanSummary>> {
        let state = self.state.lock().await;
        let mut loans: Vec<&Loan> = state.loans.values().filter(|l| l.is_overdue(now)).collect();
        loans.sort_by_key(|l| (l.due_date, l.loan_id));
        Ok(loans.into_iter().filter_map(|l| state.summary(l)).collect())
    }

    async fn all_open_loans(&self) -> AppResult<Vec<LoanSummary>> {
        let state = self.state.lock().await;
        let mut loans: Vec<&Loan> = state.loans.values().filter(|l| l.is_open()).collect();
        loans.sort_by_key(|l| (l.due_date, l.loan_id));
        Ok(loans.into_iter().filter_map(|l| state.summary(l)).collect())
    }

    async fn open_loans(&self, student_id: i32) -> AppResult<Vec<StudentLoan>> {
        let state = self.state.lock().await;
        let mut loans: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.student_id == student_id && l.is_open())
            .collect();
        loans.sort_by_key(|l| (l.due_date, l.loan_id));
        Ok(loans
            .into_iter()
            .filter_map(|l| state.student_loan(l))
            .collect())
    }

    async fn loan_history(&self, student_id: i32) -> AppResult<Vec<StudentLoan>> {
        let state = self.state.lock().await;
        let mut loans: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.student_id == student_id)
            .collect();
        loans.sort_by_key(|l| std::cmp::Reverse((l.loan_date, l.loan_id)));
        Ok(loans
            .into_iter()
            .filter_map(|l| state.student_loan(l))
            .collect())
    }

    async fn student_profile(&self, student_id: i32) -> AppResult<Option<StudentProfile>> {
        let state = self.state.lock().await;
        let Some(student) = state.students.get(&student_id) else {
            return Ok(None);
        };
        let (total_loans, active_loans) = state
            .loans
            .values()
            .filter(|l| l.student_id == student_id)
            .fold((0, 0), |(total, active), l| {
                (total + 1, active + i64::from(l.is_open()))
            });

        Ok(Some(StudentProfile {
            student_id,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone(),
            postal_address: student.postal_address.clone(),
            total_loans,
            active_loans,
        }))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_credential(&self, username: &str) -> AppResult<Option<Credential>> {
        let state = self.state.lock().await;
        Ok(state.credentials.get(&username.to_lowercase()).cloned())
    }

    async fn update_password_hash(&self, username: &str, password_hash: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.credentials.get_mut(&username.to_lowercase()) {
            Some(credential) => {
                credential.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
