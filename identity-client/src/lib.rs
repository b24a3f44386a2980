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

//! REST client for the kitchen-sink Identity Issuer.
//!
//! # Example
//!
//! ```no_run
//! use identity_client::IdentityApiClient;
//!
//! # async fn example() -> Result<(), identity_client::ApiError> {
//! let client = IdentityApiClient::new("http://localhost:8080");
//! let identity = client.get_identity().await?;
//! println!("Signed in as: {}", identity.user.id);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identity;

pub use error::ApiError;
pub use kitchen_sink_types;

use kitchen_sink_types::{APIError, APIResponse};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// A typed REST client for the Identity Issuer.
#[derive(Debug, Clone)]
pub struct IdentityApiClient {
    base_url: String,
    http: Client,
}

impl IdentityApiClient {
    /// Create a client pointing at the given Identity Issuer base URL,
    /// e.g. `"http://localhost:8080"`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Parse a bare JSON body on success, or map the `APIResponse<APIError>`
/// envelope the server sends on failure.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    match status {
        200..=299 => Ok(response.json().await?),
        _ => {
            let text = response.text().await.unwrap_or_default();
            match serde_json::from_str::<APIResponse<APIError>>(&text) {
                Ok(envelope) => {
                    log::warn!(
                        "Identity Issuer returned {status}: {}",
                        envelope.result.code
                    );
                    Err(ApiError::Api {
                        status,
                        error: envelope.result,
                    })
                }
                Err(_) => Err(ApiError::ServerError { status, body: text }),
            }
        }
    }
}
