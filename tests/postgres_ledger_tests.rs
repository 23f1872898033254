//! Ledger behavior against Postgres.
//!
//! Needs a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`.
//! Every test seeds its own students and book under a random tag, so runs do
//! not interfere with each other.

use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};

use library_ledger::{
    clock::SystemClock,
    error::{AppError, ErrorKind, LedgerError},
    repository::{LedgerStore, PgStore},
    services::{lending::LendingService, queries::QueryService},
};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    pool
}

fn tag() -> String {
    format!("{:08x}", rand::random::<u32>())
}

async fn seed_student(pool: &PgPool, tag: &str, n: usize) -> i32 {
    let student_id: i32 = sqlx::query_scalar(
        "INSERT INTO students (first_name, last_name, email) VALUES ($1, $2, $3) RETURNING student_id",
    )
    .bind("Student")
    .bind(format!("{}-{}", tag, n))
    .bind(format!("{}-{}@example.org", tag, n))
    .fetch_one(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO library_cards (student_id, is_active) VALUES ($1, TRUE)")
        .bind(student_id)
        .execute(pool)
        .await
        .unwrap();
    student_id
}

async fn seed_book(pool: &PgPool, book_code: &str, copies: usize) {
    sqlx::query("INSERT INTO books (book_code, title) VALUES ($1, $2)")
        .bind(book_code)
        .bind(format!("Title {}", book_code))
        .execute(pool)
        .await
        .unwrap();
    for i in 0..copies {
        sqlx::query("INSERT INTO book_copies (book_code, barcode) VALUES ($1, $2)")
            .bind(book_code)
            .bind(format!("{}-{}", book_code, i))
            .execute(pool)
            .await
            .unwrap();
    }
}

fn ledger_error(err: AppError) -> LedgerError {
    match err {
        AppError::Ledger(e) => e,
        other => panic!("expected a ledger error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore] // Run with: cargo test -- --ignored
async fn concurrent_assignments_reserve_distinct_copies() {
    const STUDENTS: usize = 16;
    const COPIES: usize = 5;

    let pool = pool().await;
    let tag = tag();
    let book_code = format!("PG-{}", tag);
    seed_book(&pool, &book_code, COPIES).await;
    let mut students = Vec::new();
    for n in 0..STUDENTS {
        students.push(seed_student(&pool, &tag, n).await);
    }

    let store = Arc::new(PgStore::new(pool.clone()));
    let lending = LendingService::new(store.clone(), Arc::new(SystemClock), Default::default());

    let handles: Vec<_> = students
        .into_iter()
        .map(|student| {
            let lending = lending.clone();
            let book_code = book_code.clone();
            tokio::spawn(async move { lending.assign_loan(student, &book_code).await })
        })
        .collect();

    let mut copies = Vec::new();
    let mut conflicts = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(loan) => copies.push(loan.copy_id),
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {:?}", err);
                conflicts += 1;
            }
        }
    }

    copies.sort_unstable();
    copies.dedup();
    assert_eq!(copies.len(), COPIES);
    assert_eq!(conflicts, STUDENTS - COPIES);
    assert_eq!(store.available_copy_count(&book_code).await.unwrap(), 0);

    let open_on_book: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM loans l
        JOIN book_copies c ON c.copy_id = l.copy_id
        WHERE c.book_code = $1 AND l.return_date IS NULL
        "#,
    )
    .bind(&book_code)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(open_on_book, COPIES as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_returns_close_a_loan_once() {
    let pool = pool().await;
    let tag = tag();
    let book_code = format!("PG-{}", tag);
    seed_book(&pool, &book_code, 1).await;
    let student = seed_student(&pool, &tag, 0).await;

    let store = Arc::new(PgStore::new(pool.clone()));
    let lending = LendingService::new(store.clone(), Arc::new(SystemClock), Default::default());
    let loan = lending.assign_loan(student, &book_code).await.unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let lending = lending.clone();
            tokio::spawn(async move { lending.return_loan(loan.loan_id).await })
        })
        .collect();

    let mut closed = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => closed += 1,
            Err(err) => assert_eq!(ledger_error(err), LedgerError::AlreadyReturned(loan.loan_id)),
        }
    }

    assert_eq!(closed, 1);
    assert_eq!(store.available_copy_count(&book_code).await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn inactive_card_and_empty_shelf_write_nothing() {
    let pool = pool().await;
    let tag = tag();
    let book_code = format!("PG-{}", tag);
    seed_book(&pool, &book_code, 1).await;
    let blocked = seed_student(&pool, &tag, 0).await;
    let active = seed_student(&pool, &tag, 1).await;
    sqlx::query("UPDATE library_cards SET is_active = FALSE WHERE student_id = $1")
        .bind(blocked)
        .execute(&pool)
        .await
        .unwrap();

    let store = Arc::new(PgStore::new(pool.clone()));
    let lending = LendingService::new(store.clone(), Arc::new(SystemClock), Default::default());

    let err = lending.assign_loan(blocked, &book_code).await.unwrap_err();
    assert_eq!(ledger_error(err), LedgerError::CardNotActive(blocked));
    assert_eq!(store.available_copy_count(&book_code).await.unwrap(), 1);

    lending.assign_loan(active, &book_code).await.unwrap();
    let err = lending.assign_loan(active, &book_code).await.unwrap_err();
    assert_eq!(ledger_error(err), LedgerError::NoAvailableCopy(book_code.clone()));
}

#[tokio::test]
#[ignore]
async fn profile_and_overdue_read_from_single_statements() {
    let pool = pool().await;
    let tag = tag();
    let book_code = format!("PG-{}", tag);
    seed_book(&pool, &book_code, 2).await;
    let student = seed_student(&pool, &tag, 0).await;

    let store = Arc::new(PgStore::new(pool.clone()));
    let clock = Arc::new(SystemClock);
    let lending = LendingService::new(store.clone(), clock.clone(), Default::default());
    let queries = QueryService::new(store.clone(), clock);

    let first = lending.assign_loan(student, &book_code).await.unwrap();
    let second = lending.assign_loan(student, &book_code).await.unwrap();
    lending.return_loan(first.loan_id).await.unwrap();

    let profile = queries.student_profile(student).await.unwrap();
    assert_eq!(profile.total_loans, 2);
    assert_eq!(profile.active_loans, 1);

    sqlx::query("UPDATE loans SET loan_date = loan_date - INTERVAL '30 days', due_date = due_date - INTERVAL '30 days' WHERE loan_id = $1")
        .bind(second.loan_id)
        .execute(&pool)
        .await
        .unwrap();

    let overdue = queries.list_overdue().await.unwrap();
    assert!(overdue.iter().any(|l| l.loan_id == second.loan_id));
    assert!(!overdue.iter().any(|l| l.loan_id == first.loan_id));

    let history = queries.loan_history(student).await.unwrap();
    assert_eq!(history.len(), 2);
}
