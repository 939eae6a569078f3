mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn registration_returns_public_profile() {
    let app = TestApp::new();

    let (status, user) = app.register("root", "salainen").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["userName"], "root");
    assert_eq!(user["name"], "Test User");
    assert_eq!(user["blogs"], json!([]));
    assert!(user["id"].is_string());
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
}

#[tokio::test]
async fn listed_users_carry_no_password_hash() {
    let app = TestApp::new();
    app.register("root", "salainen").await;
    app.register("mluukkai", "salainen").await;

    let (status, users) = app.get("/api/users").await;

    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        assert!(user.get("passwordHash").is_none());
        assert!(!user.to_string().contains("$argon2"));
    }
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::new();
    app.register("root", "salainen").await;

    let (status, body) = app.register("root", "other").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "duplicate_key");
    let (_, users) = app.get("/api/users").await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn short_or_missing_username_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.register("ro", "salainen").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("userName"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "name": "Nameless", "password": "salainen" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_or_missing_password_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app.register("root", "sa").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("password"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/users",
            None,
            Some(json!({ "userName": "root", "name": "Superuser" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, users) = app.get("/api/users").await;
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn login_returns_token_and_identity() {
    let app = TestApp::new();
    app.register("root", "salainen").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "userName": "root", "password": "salainen" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userName"], "root");
    assert_eq!(body["name"], "Test User");
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_or_unknown_user_fails() {
    let app = TestApp::new();
    app.register("root", "salainen").await;

    for credentials in [
        json!({ "userName": "root", "password": "wrong" }),
        json!({ "userName": "nobody", "password": "salainen" }),
        json!({ "userName": "root" }),
        json!({}),
    ] {
        let (status, body) = app
            .send(Method::POST, "/api/login", None, Some(credentials))
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "unauthorized");
        assert!(body.get("token").is_none());
    }
}

#[tokio::test]
async fn issued_token_authorizes_requests() {
    let app = TestApp::new();
    let token = app.user("root").await;

    let (status, blog) = app.create_blog(&token, common::sample_blog()).await;

    assert_eq!(status, StatusCode::OK);
    let (_, users) = app.get("/api/users").await;
    assert_eq!(blog["user"], users[0]["id"]);
}
