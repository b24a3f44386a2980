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

//! API error types.
//!
//! Every failed API response is returned as `APIResponse<APIError>` with `success: false`.

use serde::{Deserialize, Serialize};

/// Structured error returned in the `result` field of a failed [`super::APIResponse`].
///
/// The `code` field is a machine-readable identifier (e.g. `"MISSING_USER_ID"`).
/// The `message` field is a human-readable description suitable for display.
/// The `engineering_error` field carries upstream detail (the managed identity
/// service's response body, transport errors) useful during development.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct APIError {
    /// Machine-readable error code (e.g. `"IDENTITY_SERVICE_ERROR"`).
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional engineering-level detail for debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engineering_error: Option<String>,
}

impl APIError {
    pub fn missing_user_id() -> Self {
        Self {
            code: "MISSING_USER_ID".to_string(),
            message: "The userId query parameter is required.".to_string(),
            engineering_error: None,
        }
    }

    pub fn invalid_user_id(detail: &str) -> Self {
        Self {
            code: "INVALID_USER_ID".to_string(),
            message: format!("Invalid user id: {detail}"),
            engineering_error: None,
        }
    }

    pub fn identity_service(detail: &str) -> Self {
        Self {
            code: "IDENTITY_SERVICE_ERROR".to_string(),
            message: "The identity service could not issue a token".to_string(),
            engineering_error: Some(detail.to_string()),
        }
    }

    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: "Internal server error".to_string(),
            engineering_error: Some(detail.to_string()),
        }
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for APIError {}
