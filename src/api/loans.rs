//! Loan desk endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{Loan, LoanSummary},
    AppState,
};

use super::AuthenticatedUser;

/// Assign loan request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignLoanRequest {
    /// Borrowing student
    #[validate(range(min = 1, message = "student_id must be positive"))]
    pub student_id: i32,
    /// Book to lend; any available copy is picked
    #[validate(length(min = 1, max = 64, message = "book_code must be 1-64 characters"))]
    pub book_code: String,
}

/// Lend a copy of a book to a student
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = AssignLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Library staff role required", body = crate::error::ErrorResponse),
        (status = 409, description = "Card not active or no copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn assign_loan(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(request): Json<AssignLoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    identity.require_staff()?;
    request.validate()?;

    let loan = state
        .services
        .lending
        .assign_loan(request.student_id, &request.book_code)
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan closed", body = Loan),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Loan>> {
    identity.require_staff()?;

    let loan = state.services.lending.return_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Every open loan
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open loans", body = Vec<LoanSummary>),
        (status = 403, description = "Library staff role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_all_open_loans(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanSummary>>> {
    identity.require_staff()?;

    let loans = state.services.queries.list_all_open_loans().await?;
    Ok(Json(loans))
}

/// Open loans past their due date, earliest first
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanSummary>),
        (status = 403, description = "Library staff role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanSummary>>> {
    identity.require_staff()?;

    let loans = state.services.queries.list_overdue().await?;
    Ok(Json(loans))
}
