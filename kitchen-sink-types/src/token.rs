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

//! Claims carried by access tokens minted by the local development issuer.
//!
//! Tokens from the managed identity service are opaque to this workspace;
//! only the local issuer produces (and the loopback calling SDK reads)
//! this payload.

use serde::{Deserialize, Serialize};

/// JWT payload for a locally issued communication token.
///
/// # Example payload
///
/// ```json
/// {
///   "sub": "8:acs:...",
///   "scp": ["voip", "chat"],
///   "exp": 1707004800,
///   "iss": "kitchen-sink-identity"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommunicationTokenClaims {
    /// Communication user id the token was issued for.
    pub sub: String,

    /// Granted scopes (`"voip"`, `"chat"`, ...).
    pub scp: Vec<String>,

    /// Expiration timestamp (Unix seconds).
    pub exp: i64,

    /// Issuer identifier. Always `"kitchen-sink-identity"`.
    pub iss: String,
}

impl CommunicationTokenClaims {
    /// The expected issuer value for tokens produced by the local issuer.
    pub const ISSUER: &'static str = "kitchen-sink-identity";
}
