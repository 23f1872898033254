//! Data models for the lending ledger

pub mod copy;
pub mod credential;
pub mod loan;
pub mod student;

// Re-export commonly used types
pub use copy::{AvailableBook, Book, BookCopy};
pub use credential::{Credential, Identity, Role};
pub use loan::{Loan, LoanSummary, NewLoan, StudentLoan};
pub use student::{LibraryCard, Student, StudentProfile};
