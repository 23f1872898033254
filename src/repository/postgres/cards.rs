//! Library card reads and updates

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::{AppResult, LedgerError},
    models::LibraryCard,
};

pub async fn get(pool: &PgPool, student_id: i32) -> AppResult<Option<LibraryCard>> {
    let card = sqlx::query_as::<_, LibraryCard>(
        "SELECT student_id, is_active, activation_date FROM library_cards WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(card)
}

/// Card row under an exclusive lock until the transaction ends
pub async fn lock(conn: &mut PgConnection, student_id: i32) -> AppResult<Option<LibraryCard>> {
    let card = sqlx::query_as::<_, LibraryCard>(
        r#"
        SELECT student_id, is_active, activation_date
        FROM library_cards
        WHERE student_id = $1
        FOR UPDATE
        "#,
    )
    .bind(student_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(card)
}

pub async fn update(
    conn: &mut PgConnection,
    student_id: i32,
    is_active: bool,
    activation_date: DateTime<Utc>,
) -> AppResult<LibraryCard> {
    sqlx::query_as::<_, LibraryCard>(
        r#"
        UPDATE library_cards
        SET is_active = $2, activation_date = $3
        WHERE student_id = $1
        RETURNING student_id, is_active, activation_date
        "#,
    )
    .bind(student_id)
    .bind(is_active)
    .bind(activation_date)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LedgerError::CardNotFound(student_id).into())
}
