//! Credential rows for the session gateway

use sqlx::PgPool;

use crate::{error::AppResult, models::Credential};

pub async fn find(pool: &PgPool, username: &str) -> AppResult<Option<Credential>> {
    let credential = sqlx::query_as::<_, Credential>(
        r#"
        SELECT credential_id, username, password_hash, role, student_id
        FROM credentials
        WHERE LOWER(username) = LOWER($1)
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(credential)
}

pub async fn update_password_hash(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
) -> AppResult<bool> {
    let result =
        sqlx::query("UPDATE credentials SET password_hash = $2 WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .bind(password_hash)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
