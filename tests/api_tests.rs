use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use callarr::api::AppState;
use callarr::config::Config;
use callarr::entities::prelude::*;
use http_body_util::BodyExt;
use sea_orm::EntityTrait;
use std::sync::Arc;
use tower::ServiceExt;

/// Default admin credentials seeded by the initial migration
const ADMIN_USER: &str = "admin";
const ADMIN_PASSWORD: &str = "password";

async fn spawn_app() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // In-memory SQLite gives every pooled connection its own database.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let state = callarr::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    (callarr::api::router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login/",
            serde_json::json!({"username": ADMIN_USER, "password": ADMIN_PASSWORD}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_logout_flow() {
    let (app, _state) = spawn_app().await;

    // Bad credentials
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login/",
            serde_json::json!({"username": ADMIN_USER, "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Missing password
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login/",
            serde_json::json!({"username": ADMIN_USER}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Successful login returns a 32-char lowercase hex token
    let token = login(&app).await;
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(token, token.to_lowercase());

    // Introspection resolves the username
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me/")
                .header("Authorization", format!("Token {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], ADMIN_USER);

    // Logout revokes the token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout/")
                .header("Authorization", format!("Token {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The same token is now rejected
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me/")
                .header("Authorization", format!("Token {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_relogin_invalidates_previous_token() {
    let (app, _state) = spawn_app().await;

    let first = login(&app).await;
    let second = login(&app).await;
    assert_ne!(first, second);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me/")
                .header("Authorization", format!("Token {first}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me/")
                .header("Authorization", format!("Token {second}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_disabled_user_cannot_login() {
    let (app, state) = spawn_app().await;

    state
        .store()
        .create_user("carol", "secret", None)
        .await
        .unwrap();

    let credentials = serde_json::json!({"username": "carol", "password": "secret"});

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login/", credentials.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    state.store().set_user_enabled("carol", false).await.unwrap();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login/", credentials))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "User is not active");
}

#[tokio::test]
async fn test_auth_header_variants() {
    let (app, _state) = spawn_app().await;

    let cases = [
        (None, "Authentication credentials were not provided."),
        (Some("Token"), "Invalid token header. No credentials provided."),
        (Some("Token a b"), "Invalid token header."),
        (
            Some("Token deadbeefdeadbeefdeadbeefdeadbeef"),
            "Invalid token.",
        ),
        (Some("Bearer sometoken"), "Authentication credentials were not provided."),
    ];

    for (header, expected_detail) in cases {
        let mut builder = Request::builder().uri("/api/auth/me/");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{header:?}");
        let body = body_json(response).await;
        assert_eq!(body["detail"], expected_detail, "{header:?}");
    }
}

#[tokio::test]
async fn test_users_list() {
    let (app, _state) = spawn_app().await;
    let token = login(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/")
                .header("Authorization", format!("Token {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], ADMIN_USER);
    assert!(users[0]["id"].is_i64());
}

#[tokio::test]
async fn test_bulk_create_happy_path() {
    let (app, state) = spawn_app().await;
    let token = login(&app).await;

    let payload = serde_json::json!({
        "records": [{
            "calldate": "2024-01-01T10:00:00",
            "src": "100",
            "dst": "200",
            "duration": 30,
            "billsec": 25,
            "disposition": "answered"
        }]
    });

    let mut request = json_request("POST", "/api/calls/bulk_create/", payload);
    request.headers_mut().insert(
        "Authorization",
        format!("Token {token}").parse().unwrap(),
    );

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["created"], 1);

    assert_eq!(state.store().call_record_count().await.unwrap(), 1);

    let row = CallRecords::find()
        .one(&state.store().conn)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.disposition, "ANSWERED");
    assert!(row.answered);
    assert_eq!(row.calldate, "2024-01-01T10:00:00+00:00");
}

#[tokio::test]
async fn test_bulk_create_rejects_whole_batch() {
    let (app, state) = spawn_app().await;
    let token = login(&app).await;

    let valid = serde_json::json!({
        "calldate": "2024-01-01T10:00:00",
        "src": "100",
        "dst": "200",
        "duration": 30,
        "billsec": 25,
        "disposition": "answered"
    });
    let mut missing_src = valid.clone();
    missing_src["src"] = serde_json::json!("");
    let mut bad_duration = valid.clone();
    bad_duration["duration"] = serde_json::json!("abc");

    let payload = serde_json::json!({ "records": [valid, missing_src, bad_duration] });

    let mut request = json_request("POST", "/api/calls/bulk_create/", payload);
    request.headers_mut().insert(
        "Authorization",
        format!("Token {token}").parse().unwrap(),
    );

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["line"], 2);
    assert_eq!(errors[0]["errors"][0], "src is empty");
    assert_eq!(errors[1]["line"], 3);
    assert_eq!(errors[1]["errors"][0], "duration must be an integer");

    // Nothing was persisted, including the valid first line
    assert_eq!(state.store().call_record_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_bulk_create_requires_records_list() {
    let (app, _state) = spawn_app().await;
    let token = login(&app).await;

    let mut request = json_request(
        "POST",
        "/api/calls/bulk_create/",
        serde_json::json!({"records": "nope"}),
    );
    request.headers_mut().insert(
        "Authorization",
        format!("Token {token}").parse().unwrap(),
    );

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "records must be a list");
}

#[tokio::test]
async fn test_bulk_create_requires_auth() {
    let (app, _state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/calls/bulk_create/",
            serde_json::json!({"records": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_single_create_forces_no_answer() {
    let (app, state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/calls/create/",
            serde_json::json!({
                "calldate": "2024-01-01 10:00:00",
                "src": "100",
                "dst": "200",
                "duration": 30,
                "billsec": 25
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["id"].is_i64());
    assert_eq!(body["src"], "100");

    let row = CallRecords::find()
        .one(&state.store().conn)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.disposition, "NO ANSWER");
    assert!(!row.answered);
}

#[tokio::test]
async fn test_single_create_validation() {
    let (app, state) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/calls/create/",
            serde_json::json!({
                "calldate": "not-a-date",
                "src": "100",
                "dst": "200",
                "duration": 30,
                "billsec": 25
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "invalid calldate format");

    assert_eq!(state.store().call_record_count().await.unwrap(), 0);
}
