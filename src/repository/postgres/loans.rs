//! Loan rows: insert, close and the desk/student read views

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::{AppResult, LedgerError},
    models::{Loan, LoanSummary, NewLoan, StudentLoan},
};

const LOAN_COLUMNS: &str = "loan_id, student_id, copy_id, loan_date, due_date, return_date";

pub async fn insert(conn: &mut PgConnection, loan: &NewLoan) -> AppResult<Loan> {
    let loan = sqlx::query_as::<_, Loan>(&format!(
        r#"
        INSERT INTO loans (student_id, copy_id, loan_date, due_date)
        VALUES ($1, $2, $3, $4)
        RETURNING {LOAN_COLUMNS}
        "#
    ))
    .bind(loan.student_id)
    .bind(loan.copy_id)
    .bind(loan.loan_date)
    .bind(loan.due_date)
    .fetch_one(&mut *conn)
    .await?;
    Ok(loan)
}

pub async fn lock(conn: &mut PgConnection, loan_id: i32) -> AppResult<Option<Loan>> {
    let loan = sqlx::query_as::<_, Loan>(&format!(
        "SELECT {LOAN_COLUMNS} FROM loans WHERE loan_id = $1 FOR UPDATE"
    ))
    .bind(loan_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(loan)
}

/// Only an open loan can be closed; the guard keeps `return_date` write-once
pub async fn close(
    conn: &mut PgConnection,
    loan_id: i32,
    returned_at: DateTime<Utc>,
) -> AppResult<Loan> {
    sqlx::query_as::<_, Loan>(&format!(
        r#"
        UPDATE loans
        SET return_date = $2
        WHERE loan_id = $1 AND return_date IS NULL
        RETURNING {LOAN_COLUMNS}
        "#
    ))
    .bind(loan_id)
    .bind(returned_at)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LedgerError::AlreadyReturned(loan_id).into())
}

pub async fn overdue(pool: &PgPool, now: DateTime<Utc>) -> AppResult<Vec<LoanSummary>> {
    let loans = sqlx::query_as::<_, LoanSummary>(
        r#"
        SELECT l.loan_id, l.due_date,
               s.first_name || ' ' || s.last_name AS student_name,
               b.title AS book_title,
               c.barcode
        FROM loans l
        JOIN students s ON s.student_id = l.student_id
        JOIN book_copies c ON c.copy_id = l.copy_id
        JOIN books b ON b.book_code = c.book_code
        WHERE l.return_date IS NULL AND l.due_date < $1
        ORDER BY l.due_date, l.loan_id
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(loans)
}

pub async fn all_open(pool: &PgPool) -> AppResult<Vec<LoanSummary>> {
    let loans = sqlx::query_as::<_, LoanSummary>(
        r#"
        SELECT l.loan_id, l.due_date,
               s.first_name || ' ' || s.last_name AS student_name,
               b.title AS book_title,
               c.barcode
        FROM loans l
        JOIN students s ON s.student_id = l.student_id
        JOIN book_copies c ON c.copy_id = l.copy_id
        JOIN books b ON b.book_code = c.book_code
        WHERE l.return_date IS NULL
        ORDER BY l.due_date, l.loan_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(loans)
}

pub async fn open_for_student(pool: &PgPool, student_id: i32) -> AppResult<Vec<StudentLoan>> {
    let loans = sqlx::query_as::<_, StudentLoan>(
        r#"
        SELECT l.loan_id, l.copy_id, c.book_code, b.title AS book_title,
               l.loan_date, l.due_date, l.return_date
        FROM loans l
        JOIN book_copies c ON c.copy_id = l.copy_id
        JOIN books b ON b.book_code = c.book_code
        WHERE l.student_id = $1 AND l.return_date IS NULL
        ORDER BY l.due_date, l.loan_id
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(loans)
}

pub async fn history_for_student(pool: &PgPool, student_id: i32) -> AppResult<Vec<StudentLoan>> {
    let loans = sqlx::query_as::<_, StudentLoan>(
        r#"
        SELECT l.loan_id, l.copy_id, c.book_code, b.title AS book_title,
               l.loan_date, l.due_date, l.return_date
        FROM loans l
        JOIN book_copies c ON c.copy_id = l.copy_id
        JOIN books b ON b.book_code = c.book_code
        WHERE l.student_id = $1
        ORDER BY l.loan_date DESC, l.loan_id DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;
    Ok(loans)
}
