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

//! Response envelope for failed requests.
//!
//! Successful identity responses are returned bare (see
//! [`Identity`](crate::Identity)) so that browser clients can read
//! `accessToken` and `user` at the top level. Failures are wrapped:
//! `{ "success": false, "result": <APIError> }`.

use serde::{Deserialize, Serialize};

/// Top-level API response envelope.
///
/// # Error example
///
/// ```json
/// { "success": false, "result": { "code": "MISSING_USER_ID", "message": "..." } }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIResponse<A: Serialize> {
    pub success: bool,
    pub result: A,
}

impl<A: Serialize> APIResponse<A> {
    /// Wrap a successful result.
    pub fn ok(result: A) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

impl APIResponse<crate::error::APIError> {
    /// Wrap an error result.
    pub fn error(err: crate::error::APIError) -> Self {
        Self {
            success: false,
            result: err,
        }
    }
}
