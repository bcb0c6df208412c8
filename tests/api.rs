//! HTTP round-trips against the in-memory backend.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use expense_tracker::{
    app::build_app,
    auth::{Caller, StaticGuard, User},
    state::AppState,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::util::ServiceExt;
use uuid::Uuid;

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn sign_up_and_login(app: &Router, email: &str) -> String {
    let creds = json!({"email": email, "password": "password123"});
    let (status, _) = call(app, Method::POST, "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, session) = call(app, Method::POST, "/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    session["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn expense_and_category_lifecycle() {
    let app = build_app(AppState::fake());
    let alice = sign_up_and_login(&app, "alice@example.com").await;
    let bob = sign_up_and_login(&app, "bob@example.com").await;

    let (status, category) = call(
        &app,
        Method::POST,
        "/categories",
        Some(&alice),
        Some(json!({"name": "Food"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["name"], "food");
    assert_eq!(category["kind"], "user");

    let (status, expense) = call(
        &app,
        Method::POST,
        "/expenses",
        Some(&alice),
        Some(json!({"amount": 42.5, "category": "Food"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["category"], "food");
    assert_eq!(expense["amount"], 42.5);
    let expense_id = expense["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/expenses/{expense_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Not authorized to access this expense");

    let (status, _) = call(&app, Method::DELETE, "/categories/Food", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/expenses/{expense_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::DELETE, "/categories/Food", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::DELETE, "/categories/travel", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Cannot delete predefined category.");

    let (status, _) = call(
        &app,
        Method::POST,
        "/categories",
        Some(&alice),
        Some(json!({"name": "Travel"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expense_with_predefined_category_is_lowercased() {
    let app = build_app(AppState::fake());
    let alice = sign_up_and_login(&app, "alice@example.com").await;

    let (status, expense) = call(
        &app,
        Method::POST,
        "/expenses",
        Some(&alice),
        Some(json!({"amount": 42.5, "category": "Groceries", "description": "weekly shop"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["category"], "groceries");

    let id = expense["id"].as_str().unwrap();
    let (status, updated) = call(
        &app,
        Method::PUT,
        &format!("/expenses/{id}"),
        Some(&alice),
        Some(json!({"amount": 10.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["amount"], 10.0);
    assert_eq!(updated["description"], "weekly shop");

    let (status, list) = call(
        &app,
        Method::GET,
        "/expenses/alice@example.com",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = call(&app, Method::PUT, "/expenses/not-a-uuid", Some(&alice), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn requests_without_valid_token_are_rejected() {
    let app = build_app(AppState::fake());

    let (status, body) = call(&app, Method::GET, "/categories", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token is missing");

    let (status, _) = call(&app, Method::GET, "/categories", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_endpoints_report_failures() {
    let app = build_app(AppState::fake());
    sign_up_and_login(&app, "alice@example.com").await;

    let creds = json!({"email": "alice@example.com", "password": "password123"});
    let (status, _) = call(&app, Method::POST, "/register", None, Some(creds)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong = json!({"email": "alice@example.com", "password": "nope-nope"});
    let (status, _) = call(&app, Method::POST, "/login", None, Some(wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/refresh",
        None,
        Some(json!({"refresh_token": "unknown"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid refresh token");
}

#[tokio::test]
async fn users_can_read_and_delete_only_themselves() {
    let app = build_app(AppState::fake());
    let alice = sign_up_and_login(&app, "alice@example.com").await;
    sign_up_and_login(&app, "bob@example.com").await;

    let (status, profile) = call(&app, Method::GET, "/users/alice@example.com", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "alice@example.com");

    let (status, _) = call(&app, Method::GET, "/users/bob@example.com", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, "/users/bob@example.com", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, "/users/alice@example.com", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // token still verifies but the user row is gone
    let (status, _) = call(&app, Method::GET, "/users/alice@example.com", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guard_can_be_substituted() {
    let user = User {
        id: Uuid::new_v4(),
        email: "carol@example.com".into(),
        created_at: OffsetDateTime::now_utc(),
    };
    let state = AppState::fake().with_guard(Arc::new(StaticGuard(Caller {
        user,
        token: String::new(),
    })));
    let app = build_app(state);

    let (status, list) = call(&app, Method::GET, "/categories", Some("anything"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["kind"], "predefined");
    assert!(list[0]["id"].is_null());

    let (status, _) = call(&app, Method::GET, "/categories/Travel", Some("anything"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/categories/yachts", Some("anything"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_frees_up_after_recategorizing_its_expenses() {
    let app = build_app(AppState::fake());
    let alice = sign_up_and_login(&app, "alice@example.com").await;

    let (status, _) = call(&app, Method::POST, "/categories", Some(&alice), Some(json!({"name": "Pets"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, expense) = call(
        &app,
        Method::POST,
        "/expenses",
        Some(&alice),
        Some(json!({"amount": 19.99, "category": "pets"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = expense["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::DELETE, "/categories/Pets", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = call(
        &app,
        Method::PUT,
        &format!("/expenses/{id}"),
        Some(&alice),
        Some(json!({"category": "Groceries"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["category"], "groceries");

    let (status, _) = call(&app, Method::DELETE, "/categories/Pets", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, "/categories/pets", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_category_name_is_not_found_on_read_and_delete() {
    let app = build_app(AppState::fake());
    let alice = sign_up_and_login(&app, "alice@example.com").await;

    let (status, body) = call(&app, Method::GET, "/categories/%20", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Category not found");
    let (status, _) = call(&app, Method::DELETE, "/categories/%20", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // creating one is still a validation error
    let (status, _) = call(&app, Method::POST, "/categories", Some(&alice), Some(json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let app = build_app(AppState::fake());
    let alice = sign_up_and_login(&app, "alice@example.com").await;

    let req = Request::get("/categories")
        .header(header::AUTHORIZATION, format!("BEARER {alice}"))
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
