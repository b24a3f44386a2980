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

//! Error types for the Identity Issuer client.

use kitchen_sink_types::APIError;
use thiserror::Error;

/// Errors returned by [`IdentityApiClient`](crate::IdentityApiClient) methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with its structured error envelope.
    #[error("Identity Issuer error ({status}): {error}")]
    Api { status: u16, error: APIError },

    /// A non-success status without a readable error body.
    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: String },

    /// A network or transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A configuration error (e.g. missing base URL).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::ServerError { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Config(_) => None,
        }
    }
}
