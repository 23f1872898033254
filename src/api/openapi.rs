//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, students};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Lending Ledger API",
        version = "0.1.0",
        description = "Loans, library cards and copy inventory"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::me,
        auth::change_password,
        // Loans
        loans::assign_loan,
        loans::return_loan,
        loans::list_all_open_loans,
        loans::list_overdue,
        // Students
        students::get_profile,
        students::get_open_loans,
        students::get_loan_history,
        students::activate_card,
        students::deactivate_card,
        // Books
        books::list_available,
        books::list_copies,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::ChangePasswordRequest,
            loans::AssignLoanRequest,
            crate::models::Identity,
            crate::models::Role,
            crate::models::Loan,
            crate::models::LoanSummary,
            crate::models::StudentLoan,
            crate::models::StudentProfile,
            crate::models::LibraryCard,
            crate::models::AvailableBook,
            crate::models::BookCopy,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Sessions and credentials"),
        (name = "loans", description = "Loan desk"),
        (name = "students", description = "Student records and library cards"),
        (name = "books", description = "Copy inventory")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
