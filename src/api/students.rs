//! Student-scoped endpoints: profile, loans and library card

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{LibraryCard, StudentLoan, StudentProfile},
    AppState,
};

use super::AuthenticatedUser;

/// Student identity with loan counters
#[utoipa::path(
    get,
    path = "/students/{id}/profile",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student profile", body = StudentProfile),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(student_id): Path<i32>,
) -> AppResult<Json<StudentProfile>> {
    identity.require_student_access(student_id)?;

    let profile = state.services.queries.student_profile(student_id).await?;
    Ok(Json(profile))
}

/// Open loans of a student
#[utoipa::path(
    get,
    path = "/students/{id}/loans",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Open loans", body = Vec<StudentLoan>),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_open_loans(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(student_id): Path<i32>,
) -> AppResult<Json<Vec<StudentLoan>>> {
    identity.require_student_access(student_id)?;

    let loans = state.services.queries.list_open_loans(student_id).await?;
    Ok(Json(loans))
}

/// Full loan history of a student, newest first
#[utoipa::path(
    get,
    path = "/students/{id}/history",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Loan history", body = Vec<StudentLoan>),
        (status = 403, description = "Not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan_history(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(student_id): Path<i32>,
) -> AppResult<Json<Vec<StudentLoan>>> {
    identity.require_student_access(student_id)?;

    let loans = state.services.queries.loan_history(student_id).await?;
    Ok(Json(loans))
}

/// Activate a library card
#[utoipa::path(
    put,
    path = "/students/{id}/card/activate",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Card state after the call", body = LibraryCard),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse),
        (status = 404, description = "Card not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn activate_card(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(student_id): Path<i32>,
) -> AppResult<Json<LibraryCard>> {
    identity.require_admin()?;

    let card = state.services.cards.activate(student_id).await?;
    Ok(Json(card))
}

/// Deactivate a library card
#[utoipa::path(
    put,
    path = "/students/{id}/card/deactivate",
    tag = "students",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Card state after the call", body = LibraryCard),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse),
        (status = 404, description = "Card not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn deactivate_card(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(student_id): Path<i32>,
) -> AppResult<Json<LibraryCard>> {
    identity.require_admin()?;

    let card = state.services.cards.deactivate(student_id).await?;
    Ok(Json(card))
}
