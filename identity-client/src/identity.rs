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

//! Identity endpoints: mint a user, refresh its token.

use kitchen_sink_types::{AccessToken, Identity};

use crate::error::ApiError;
use crate::{parse_response, IdentityApiClient};

impl IdentityApiClient {
    /// Request a brand new identity and access token.
    ///
    /// Calls `GET /Identity`.
    pub async fn get_identity(&self) -> Result<Identity, ApiError> {
        let response = self.get("/Identity").send().await?;
        parse_response(response).await
    }

    /// Request a fresh access token for an existing user.
    ///
    /// Calls `GET /Identity/token?userId={user_id}`.
    pub async fn refresh_token(&self, user_id: &str) -> Result<AccessToken, ApiError> {
        if user_id.trim().is_empty() {
            return Err(ApiError::Config("user id must not be empty".to_string()));
        }
        let response = self
            .get("/Identity/token")
            .query(&[("userId", user_id)])
            .send()
            .await?;
        parse_response(response).await
    }
}
