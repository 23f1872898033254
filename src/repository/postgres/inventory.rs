//! Copy reservation and inventory reads

use sqlx::{PgConnection, PgPool};

use crate::{
    error::{AppResult, LedgerError},
    models::{AvailableBook, BookCopy},
};

/// Compare-and-swap on the availability flag.
///
/// The subquery picks the lowest copy id not locked by a concurrent
/// reservation; the outer `AND is_available` guard plus `RETURNING` make a
/// lost race come back as zero rows instead of a double assignment.
pub async fn reserve_copy(conn: &mut PgConnection, book_code: &str) -> AppResult<i32> {
    let copy_id = sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE book_copies
        SET is_available = FALSE
        WHERE copy_id = (
            SELECT copy_id
            FROM book_copies
            WHERE book_code = $1 AND is_available
            ORDER BY copy_id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        AND is_available
        RETURNING copy_id
        "#,
    )
    .bind(book_code)
    .fetch_optional(&mut *conn)
    .await?;

    copy_id.ok_or_else(|| LedgerError::NoAvailableCopy(book_code.to_string()).into())
}

pub async fn release_copy(conn: &mut PgConnection, copy_id: i32) -> AppResult<()> {
    let result = sqlx::query("UPDATE book_copies SET is_available = TRUE WHERE copy_id = $1")
        .bind(copy_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::UnknownCopy(copy_id).into());
    }
    Ok(())
}

pub async fn available_copy_count(pool: &PgPool, book_code: &str) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM book_copies WHERE book_code = $1 AND is_available",
    )
    .bind(book_code)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn book_copies(pool: &PgPool, book_code: &str) -> AppResult<Vec<BookCopy>> {
    let copies = sqlx::query_as::<_, BookCopy>(
        r#"
        SELECT copy_id, book_code, rack_number, barcode, price, purchase_date, is_available
        FROM book_copies
        WHERE book_code = $1
        ORDER BY copy_id
        "#,
    )
    .bind(book_code)
    .fetch_all(pool)
    .await?;
    Ok(copies)
}

pub async fn available_books(pool: &PgPool) -> AppResult<Vec<AvailableBook>> {
    let books = sqlx::query_as::<_, AvailableBook>(
        r#"
        SELECT b.book_code, b.title, COUNT(c.copy_id) AS available_copies
        FROM books b
        JOIN book_copies c ON c.book_code = b.book_code AND c.is_available
        GROUP BY b.book_code, b.title
        ORDER BY b.title, b.book_code
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(books)
}
