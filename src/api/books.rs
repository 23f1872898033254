//! Inventory endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{AvailableBook, BookCopy},
    AppState,
};

use super::AuthenticatedUser;

/// Books with at least one copy on the shelf
#[utoipa::path(
    get,
    path = "/books/available",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available books with copy counts", body = Vec<AvailableBook>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_available(
    State(state): State<AppState>,
    AuthenticatedUser(_identity): AuthenticatedUser,
) -> AppResult<Json<Vec<AvailableBook>>> {
    let books = state.services.queries.available_books().await?;
    Ok(Json(books))
}

/// Copies of one book, lent or not
#[utoipa::path(
    get,
    path = "/books/{code}/copies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("code" = String, Path, description = "Book code")
    ),
    responses(
        (status = 200, description = "Copies of the book", body = Vec<BookCopy>),
        (status = 403, description = "Library staff role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_copies(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(book_code): Path<String>,
) -> AppResult<Json<Vec<BookCopy>>> {
    identity.require_staff()?;

    let copies = state.services.queries.book_copies(&book_code).await?;
    Ok(Json(copies))
}
