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

//! Communication access token generation for the local issuer.
//!
//! Tokens are HS256 JWTs carrying [`CommunicationTokenClaims`]. The loopback
//! calling SDK reads the `sub` claim to learn which user an agent belongs to.

use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use kitchen_sink_types::{AccessToken, CommunicationTokenClaims, TokenScope};

use crate::issuer::IssuerError;

/// Sign a communication token for `user_id` valid for `ttl_secs`.
pub fn generate_communication_token(
    secret: &str,
    ttl_secs: i64,
    user_id: &str,
    scopes: &[TokenScope],
) -> Result<AccessToken, IssuerError> {
    let exp = Utc::now().timestamp() + ttl_secs;
    let claims = CommunicationTokenClaims {
        sub: user_id.to_string(),
        scp: scopes.iter().map(|s| s.as_str().to_string()).collect(),
        exp,
        iss: CommunicationTokenClaims::ISSUER.to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign JWT: {e}");
        IssuerError::Signing(e.to_string())
    })?;

    let expires_on = Utc
        .timestamp_opt(exp, 0)
        .single()
        .ok_or_else(|| IssuerError::Signing(format!("expiry {exp} out of range")))?;

    Ok(AccessToken::new(token, expires_on))
}
