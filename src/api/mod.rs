//! HTTP handlers for the lending ledger

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod students;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::CorsConfig, error::AppError, models::Identity, AppState};

/// Caller resolved from the `Authorization: Bearer` session token
pub struct AuthenticatedUser(pub Identity);

/// Raw session token of the request, for endpoints acting on the session itself
pub struct SessionToken(pub String);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.services.auth.authorize(token)?;
        Ok(AuthenticatedUser(identity))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(bearer_token(parts)?.to_string()))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        // Loans
        .route("/loans", get(loans::list_all_open_loans).post(loans::assign_loan))
        .route("/loans/overdue", get(loans::list_overdue))
        .route("/loans/:id/return", post(loans::return_loan))
        // Students
        .route("/students/:id/profile", get(students::get_profile))
        .route("/students/:id/loans", get(students::get_open_loans))
        .route("/students/:id/history", get(students::get_loan_history))
        .route("/students/:id/card/activate", put(students::activate_card))
        .route("/students/:id/card/deactivate", put(students::deactivate_card))
        // Books
        .route("/books/available", get(books::list_available))
        .route("/books/:code/copies", get(books::list_copies))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allow_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
