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

//! Shared test helpers for identity-api integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use identity_api::{
    issuer::{IdentityIssuer, IssuerError, LocalIdentityIssuer},
    routes,
    state::AppState,
};
use kitchen_sink_types::{AccessToken, Identity, TokenScope};
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-secret-for-integration-tests";
const TEST_TOKEN_TTL: i64 = 600;

/// Issuer whose upstream always fails, as an unreachable identity service would.
pub struct FailingIssuer;

#[async_trait]
impl IdentityIssuer for FailingIssuer {
    async fn create_user_and_token(&self, _: &[TokenScope]) -> Result<Identity, IssuerError> {
        Err(IssuerError::Status {
            status: 503,
            body: "identity service unavailable".to_string(),
        })
    }

    async fn issue_token(&self, _: &str, _: &[TokenScope]) -> Result<AccessToken, IssuerError> {
        Err(IssuerError::Status {
            status: 503,
            body: "identity service unavailable".to_string(),
        })
    }
}

/// Build the router around an arbitrary issuer, ready for `tower::ServiceExt::oneshot`.
pub fn build_app_with(issuer: Arc<dyn IdentityIssuer>) -> Router {
    let state = AppState {
        issuer,
        scopes: TokenScope::DEFAULT.to_vec(),
    };
    routes::router().with_state(state)
}

/// Build the router backed by the local development issuer.
pub fn build_app() -> Router {
    build_app_with(Arc::new(LocalIdentityIssuer::new(
        TEST_JWT_SECRET,
        TEST_TOKEN_TTL,
        Uuid::new_v4(),
    )))
}

/// Consume a response body and deserialize JSON into `T`.
pub async fn response_json<T: DeserializeOwned>(resp: Response) -> T {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("deserialize response body")
}
