//! Router-level tests: authentication, permissions and status mapping

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_ledger::{
    api::create_router,
    clock::SystemClock,
    config::AppConfig,
    models::Role,
    repository::MemoryStore,
    services::{auth::hash_password, Services},
    AppState,
};

struct TestApp {
    router: Router,
    student_id: i32,
    other_student_id: i32,
}

async fn test_app() -> TestApp {
    let config = AppConfig::default();
    let store = MemoryStore::new();

    let student_id = store.add_student("Ada", "Lovelace", "ada@example.org").await;
    let other_student_id = store.add_student("Alan", "Turing", "alan@example.org").await;
    store.add_book("B1", "Dune").await;
    store.add_copy("B1", "BC-1").await;

    store
        .add_credential("admin", &hash_password("admin-pass").unwrap(), Role::Admin, None)
        .await;
    store
        .add_credential("desk", &hash_password("desk-pass").unwrap(), Role::LibraryAgent, None)
        .await;
    store
        .add_credential(
            "ada",
            &hash_password("ada-pass").unwrap(),
            Role::Student,
            Some(student_id),
        )
        .await;

    let services = Services::new(
        Arc::new(store.clone()),
        Arc::new(store),
        Arc::new(SystemClock),
        &config.lending,
        &config.auth,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    TestApp {
        router: create_router(state),
        student_id,
        other_student_id,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &TestApp, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_readiness() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "desk", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
    assert_eq!(body["message"], "Invalid username or password");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "ghost", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/v1/loans/overdue", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some("deadbeef"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn desk_lends_and_takes_back_a_copy() {
    let app = test_app().await;
    let token = login(&app, "desk", "desk-pass").await;

    let (status, loan) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({ "student_id": app.student_id, "book_code": "B1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["student_id"], app.student_id);
    assert!(loan["return_date"].is_null());
    let loan_id = loan["loan_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({ "student_id": app.other_student_id, "book_code": "B1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 9);

    let (status, open) = send(&app, Method::GET, "/api/v1/loans", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["student_name"], "Ada Lovelace");

    let uri = format!("/api/v1/loans/{}/return", loan_id);
    let (status, closed) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(closed["return_date"].is_string());

    let (status, body) = send(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 10);
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let app = test_app().await;
    let token = login(&app, "desk", "desk-pass").await;

    let (status, body) = send(&app, Method::POST, "/api/v1/loans/77/return", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn malformed_assign_request_is_bad_request() {
    let app = test_app().await;
    let token = login(&app, "desk", "desk-pass").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({ "student_id": 0, "book_code": "B1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 11);
}

#[tokio::test]
async fn students_only_see_their_own_records() {
    let app = test_app().await;
    let token = login(&app, "ada", "ada-pass").await;

    let own = format!("/api/v1/students/{}/profile", app.student_id);
    let (status, profile) = send(&app, Method::GET, &own, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["total_loans"], 0);

    let other = format!("/api/v1/students/{}/loans", app.other_student_id);
    let (status, _) = send(&app, Method::GET, &other, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({ "student_id": app.student_id, "book_code": "B1" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, books) = send(&app, Method::GET, "/api/v1/books/available", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books[0]["available_copies"], 1);
}

#[tokio::test]
async fn only_admins_toggle_cards() {
    let app = test_app().await;
    let desk = login(&app, "desk", "desk-pass").await;
    let admin = login(&app, "admin", "admin-pass").await;
    let uri = format!("/api/v1/students/{}/card/deactivate", app.student_id);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&desk), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, card) = send(&app, Method::PUT, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["is_active"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&desk),
        Some(json!({ "student_id": app.student_id, "book_code": "B1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 8);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = test_app().await;
    let token = login(&app, "desk", "desk-pass").await;

    let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "library_agent");

    let (status, _) = send(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_takes_effect() {
    let app = test_app().await;
    let token = login(&app, "ada", "ada-pass").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/password",
        Some(&token),
        Some(json!({ "current_password": "ada-pass", "new_password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/password",
        Some(&token),
        Some(json!({ "current_password": "wrong-pass", "new_password": "longer-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/password",
        Some(&token),
        Some(json!({ "current_password": "ada-pass", "new_password": "longer-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    login(&app, "ada", "longer-secret").await;
}
