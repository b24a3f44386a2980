/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Integration tests for `GET /Identity` and `GET /Identity/token`.

mod test_helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jsonwebtoken::{decode, DecodingKey, Validation};
use kitchen_sink_types::{
    identifier::COMMUNICATION_USER_ID_LEN, APIError, APIResponse, AccessToken,
    CommunicationTokenClaims, Identity,
};
use test_helpers::*;
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_identity_returns_camel_case_payload() {
    let resp = build_app().oneshot(get("/Identity")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = response_json(resp).await;
    let token = body["accessToken"]["token"].as_str().expect("token");
    let user_id = body["user"]["id"].as_str().expect("user id");
    assert!(body["accessToken"]["expiresOn"].is_string());
    assert!(!token.is_empty());
    assert_eq!(user_id.len(), COMMUNICATION_USER_ID_LEN);
    assert!(user_id.starts_with("8:acs:"));
}

#[tokio::test]
async fn test_identity_token_is_scoped_for_voip_and_chat() {
    let resp = build_app().oneshot(get("/Identity")).await.unwrap();
    let identity: Identity = response_json(resp).await;

    let mut validation = Validation::default();
    validation.set_issuer(&[CommunicationTokenClaims::ISSUER]);
    let claims = decode::<CommunicationTokenClaims>(
        &identity.access_token.token,
        &DecodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        &validation,
    )
    .expect("token should verify")
    .claims;

    assert_eq!(claims.sub, identity.user.id);
    assert_eq!(claims.scp, vec!["voip", "chat"]);
}

#[tokio::test]
async fn test_each_request_mints_a_new_user() {
    let app = build_app();
    let first: Identity = response_json(app.clone().oneshot(get("/Identity")).await.unwrap()).await;
    let second: Identity = response_json(app.oneshot(get("/Identity")).await.unwrap()).await;
    assert_ne!(first.user.id, second.user.id);
}

#[tokio::test]
async fn test_lowercase_alias_is_served() {
    let resp = build_app().oneshot(get("/identity")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let app = build_app_with(Arc::new(FailingIssuer));
    let resp = app.oneshot(get("/Identity")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: APIResponse<APIError> = response_json(resp).await;
    assert!(!body.success);
    assert_eq!(body.result.code, "IDENTITY_SERVICE_ERROR");
    assert!(body
        .result
        .engineering_error
        .unwrap_or_default()
        .contains("unavailable"));
}

#[tokio::test]
async fn test_refresh_requires_user_id() {
    let app = build_app();

    let resp = app.clone().oneshot(get("/Identity/token")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: APIResponse<APIError> = response_json(resp).await;
    assert_eq!(body.result.code, "MISSING_USER_ID");

    let resp = app.oneshot(get("/Identity/token?userId=%20")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_rejects_malformed_user_id() {
    let resp = build_app()
        .oneshot(get("/Identity/token?userId=bob"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: APIResponse<APIError> = response_json(resp).await;
    assert_eq!(body.result.code, "INVALID_USER_ID");
}

#[tokio::test]
async fn test_refresh_issues_token_for_existing_user() {
    let app = build_app();
    let identity: Identity =
        response_json(app.clone().oneshot(get("/Identity")).await.unwrap()).await;

    let encoded: String =
        url::form_urlencoded::byte_serialize(identity.user.id.as_bytes()).collect();
    let resp = app
        .oneshot(get(&format!("/Identity/token?userId={encoded}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let token: AccessToken = response_json(resp).await;
    assert!(!token.token.is_empty());
}

#[tokio::test]
async fn test_refresh_failure_upstream_is_server_error() {
    let app = build_app_with(Arc::new(FailingIssuer));
    let resp = app
        .oneshot(get("/Identity/token?userId=someone"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
