//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{error::AppResult, models::Identity, AppState};

use super::{AuthenticatedUser, SessionToken};

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 128, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response carrying the session token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque bearer token
    pub token: String,
    pub token_type: String,
    /// Session lifetime in seconds
    pub expires_in: i64,
    pub identity: Identity,
}

/// Password change request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Open a session
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 400, description = "Malformed request", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    request.validate()?;

    let (token, identity) = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.session_ttl_minutes * 60,
        identity,
    }))
}

/// Revoke the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    SessionToken(token): SessionToken,
) -> StatusCode {
    state.services.auth.logout(&token);
    tracing::info!(username = %identity.username, "Session closed");
    StatusCode::NO_CONTENT
}

/// Identity behind the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current caller", body = Identity),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(AuthenticatedUser(identity): AuthenticatedUser) -> Json<Identity> {
    Json(identity)
}

/// Change the caller's own password
#[utoipa::path(
    put,
    path = "/auth/password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Password too short", body = crate::error::ErrorResponse),
        (status = 401, description = "Current password is incorrect", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    request.validate()?;

    state
        .services
        .auth
        .change_password(&identity, &request.current_password, &request.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
