// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Router-level authentication tests.

use atelier_api::config::Config;
use atelier_api::models::Role;
use atelier_api::services::token::AccessClaims;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("reading body");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_garbage_token_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn me_with_valid_token_returns_profile() {
    let (app, state) = common::create_test_app();

    let user = common::test_user("alice@example.com");
    state.store.create(&user).await.unwrap();
    let token = state.tokens.issue_access_token(&user).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "USER");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn me_with_expired_token_reports_token_expired() {
    let (app, state) = common::create_test_app();

    let user = common::test_user("alice@example.com");
    state.store.create(&user).await.unwrap();

    let now = Utc::now().timestamp();
    let expired = encode(
        &Header::new(Algorithm::HS256),
        &AccessClaims {
            sub: user.email.clone(),
            role: Role::User,
            id: user.id.clone(),
            username: user.username.clone(),
            avatar: None,
            iat: now - 7200,
            exp: now - 3600,
        },
        &EncodingKey::from_secret(&Config::test_default().jwt_signing_key),
    )
    .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {expired}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn login_start_redirects_to_google() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/google")
                .header(header::HOST, "localhost:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|h| h.to_str().ok())
        .unwrap();
    assert!(location.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn refresh_mints_a_fresh_access_token_with_current_role() {
    let (app, state) = common::create_test_app();

    let mut user = common::test_user("alice@example.com");
    state.store.create(&user).await.unwrap();
    let refresh_token = state
        .tokens
        .issue_refresh_token("alice@example.com")
        .await
        .unwrap();

    // Promote the user after the refresh token was minted; the new access
    // token must carry the current role.
    user.is_admin = true;
    state.store.update(&user).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "refresh_token": refresh_token }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let access_token = body["access_token"].as_str().unwrap();

    let claims = state.tokens.decode_access(access_token).unwrap();
    assert_eq!(claims.sub, "alice@example.com");
    assert_eq!(claims.role, Role::Admin);
}

#[tokio::test]
async fn refresh_for_deleted_user_is_not_found() {
    let (app, state) = common::create_test_app();

    let user = common::test_user("gone@example.com");
    state.store.create(&user).await.unwrap();
    let refresh_token = state
        .tokens
        .issue_refresh_token("gone@example.com")
        .await
        .unwrap();

    // Fresh store: same signing key, no user record.
    let (app2, _) = common::create_test_app();
    drop((app, state));

    let response = app2
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "refresh_token": refresh_token }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_for_blocked_user_is_forbidden() {
    let (app, state) = common::create_test_app();

    let mut user = common::test_user("blocked@example.com");
    state.store.create(&user).await.unwrap();
    let refresh_token = state
        .tokens
        .issue_refresh_token("blocked@example.com")
        .await
        .unwrap();

    user.active = false;
    state.store.update(&user).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "refresh_token": refresh_token }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "account_blocked");
}

#[tokio::test]
async fn refresh_with_expired_refresh_token_is_unauthorized() {
    let (app, state) = common::create_test_app();

    let user = common::test_user("alice@example.com");
    state.store.create(&user).await.unwrap();

    let now = Utc::now().timestamp();
    let expired = encode(
        &Header::new(Algorithm::HS256),
        &json!({ "sub": "alice@example.com", "iat": now - 7200, "exp": now - 3600 }),
        &EncodingKey::from_secret(&Config::test_default().jwt_signing_key),
    )
    .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "refresh_token": expired }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "token_expired");
}
