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

//! Identity issuers: the managed identity service behind `GET /Identity`.
//!
//! Handlers only see the [`IdentityIssuer`] trait. [`AcsIdentityClient`]
//! talks to Azure Communication Services; [`LocalIdentityIssuer`] mints
//! tokens in-process for development and tests.

mod acs;
mod local;

use std::sync::Arc;

use async_trait::async_trait;
use kitchen_sink_types::{AccessToken, Identity, TokenScope};
use thiserror::Error;

use crate::config::{Config, IssuerConfig};

pub use acs::{sign_request, AcsIdentityClient, ConnectionString, SignedRequest};
pub use local::LocalIdentityIssuer;

/// Errors raised while talking to the identity service.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// The request never produced a response.
    #[error("request to identity service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The identity service answered with a non-success status.
    #[error("identity service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The identity service answered with something we could not read.
    #[error("unexpected identity service response: {0}")]
    InvalidResponse(String),

    /// The caller named a user the issuer cannot mint tokens for.
    #[error("invalid user id: {0}")]
    InvalidUser(String),

    /// Local token signing failed.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// The issuer configuration is unusable (bad connection string, key).
    #[error("invalid issuer configuration: {0}")]
    Config(String),
}

/// A source of communication identities and access tokens.
#[async_trait]
pub trait IdentityIssuer: Send + Sync {
    /// Mint a new communication user and an access token for it.
    async fn create_user_and_token(&self, scopes: &[TokenScope]) -> Result<Identity, IssuerError>;

    /// Issue a fresh access token for an existing user.
    async fn issue_token(
        &self,
        user_id: &str,
        scopes: &[TokenScope],
    ) -> Result<AccessToken, IssuerError>;
}

/// Build the issuer selected by `config`.
pub fn build_issuer(config: &Config) -> Result<Arc<dyn IdentityIssuer>, IssuerError> {
    match &config.issuer {
        IssuerConfig::Acs {
            connection_string,
            api_version,
        } => {
            let connection: ConnectionString = connection_string.parse()?;
            Ok(Arc::new(AcsIdentityClient::new(connection, api_version)))
        }
        IssuerConfig::Local {
            jwt_secret,
            token_ttl_secs,
            resource_id,
        } => Ok(Arc::new(LocalIdentityIssuer::new(
            jwt_secret,
            *token_ttl_secs,
            *resource_id,
        ))),
    }
}
