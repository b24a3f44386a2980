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

//! In-process issuer used when no ACS connection string is configured.

use async_trait::async_trait;
use kitchen_sink_types::{
    AccessToken, CommunicationUser, CommunicationUserId, Identity, TokenScope,
};
use uuid::Uuid;

use super::{IdentityIssuer, IssuerError};
use crate::token::generate_communication_token;

/// Mints `8:acs:` identifiers under a fixed resource id and signs tokens
/// with a shared secret.
pub struct LocalIdentityIssuer {
    secret: String,
    ttl_secs: i64,
    resource_id: Uuid,
}

impl LocalIdentityIssuer {
    pub fn new(secret: &str, ttl_secs: i64, resource_id: Uuid) -> Self {
        Self {
            secret: secret.to_string(),
            ttl_secs,
            resource_id,
        }
    }
}

#[async_trait]
impl IdentityIssuer for LocalIdentityIssuer {
    async fn create_user_and_token(&self, scopes: &[TokenScope]) -> Result<Identity, IssuerError> {
        let user_id = CommunicationUserId::generate(self.resource_id);
        let access_token =
            generate_communication_token(&self.secret, self.ttl_secs, user_id.as_str(), scopes)?;
        tracing::info!("Issued local identity {user_id}");
        Ok(Identity {
            access_token,
            user: CommunicationUser {
                id: user_id.into(),
            },
        })
    }

    async fn issue_token(
        &self,
        user_id: &str,
        scopes: &[TokenScope],
    ) -> Result<AccessToken, IssuerError> {
        let parsed: CommunicationUserId = user_id
            .parse()
            .map_err(|e| IssuerError::InvalidUser(format!("{user_id}: {e}")))?;
        generate_communication_token(&self.secret, self.ttl_secs, parsed.as_str(), scopes)
    }
}
