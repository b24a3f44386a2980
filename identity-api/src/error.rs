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

//! Application error type that implements Axum's `IntoResponse`.
//!
//! Every error is returned as `APIResponse<APIError>` with `success: false`,
//! paired with the appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kitchen_sink_types::{APIError, APIResponse};

use crate::issuer::IssuerError;

/// Application-level error that pairs an HTTP status code with an [`APIError`].
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: APIError,
}

impl AppError {
    pub fn new(status: StatusCode, body: APIError) -> Self {
        Self { status, body }
    }

    pub fn missing_user_id() -> Self {
        Self::new(StatusCode::BAD_REQUEST, APIError::missing_user_id())
    }

    pub fn invalid_user_id(detail: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, APIError::invalid_user_id(detail))
    }

    pub fn identity_service(detail: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            APIError::identity_service(detail),
        )
    }

    pub fn internal(detail: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            APIError::internal_error(detail),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = APIResponse::error(self.body);
        (self.status, Json(body)).into_response()
    }
}

impl From<IssuerError> for AppError {
    fn from(err: IssuerError) -> Self {
        match err {
            IssuerError::InvalidUser(detail) => Self::invalid_user_id(&detail),
            IssuerError::Signing(detail) => {
                tracing::error!("Token signing failed: {detail}");
                Self::internal(&detail)
            }
            other => {
                tracing::error!("Identity service error: {other}");
                Self::identity_service(&other.to_string())
            }
        }
    }
}
