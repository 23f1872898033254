//! Student lookups and the profile aggregate

use sqlx::PgPool;

use crate::{error::AppResult, models::StudentProfile};

pub async fn exists(pool: &PgPool, student_id: i32) -> AppResult<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE student_id = $1)")
            .bind(student_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Identity and both counters come from one statement, so they can never
/// straddle a concurrent assign or return.
pub async fn profile(pool: &PgPool, student_id: i32) -> AppResult<Option<StudentProfile>> {
    let profile = sqlx::query_as::<_, StudentProfile>(
        r#"
        SELECT s.student_id, s.first_name, s.last_name, s.email, s.phone, s.postal_address,
               COUNT(l.loan_id) AS total_loans,
               COUNT(l.loan_id) FILTER (WHERE l.return_date IS NULL) AS active_loans
        FROM students s
        LEFT JOIN loans l ON l.student_id = s.student_id
        WHERE s.student_id = $1
        GROUP BY s.student_id
        "#,
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}
