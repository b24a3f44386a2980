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

//! Identity payload returned by `GET /Identity`.
//!
//! The JSON shape mirrors what the managed identity service hands out for a
//! "create user and token" request:
//!
//! ```json
//! {
//!   "accessToken": { "token": "eyJ...", "expiresOn": "2025-03-01T10:00:00Z" },
//!   "user": { "id": "8:acs:..." }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A freshly minted communication user together with its first access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub access_token: AccessToken,
    pub user: CommunicationUser,
}

/// Bearer token accepted by the calling service, with its expiry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token expires at or before `now + margin`.
    pub fn expires_within(&self, margin: TimeDelta, now: DateTime<Utc>) -> bool {
        self.expires_on <= now + margin
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_within(TimeDelta::zero(), now)
    }
}

/// The `user` half of an [`Identity`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct CommunicationUser {
    pub id: String,
}

/// Capability a token is issued for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    #[serde(rename = "chat")]
    Chat,
    #[serde(rename = "chat.join")]
    ChatJoin,
    #[serde(rename = "chat.join.limited")]
    ChatJoinLimited,
    #[serde(rename = "voip")]
    VoIP,
    #[serde(rename = "voip.join")]
    VoIPJoin,
}

impl TokenScope {
    /// Scopes the kitchen sink asks for when none are configured.
    pub const DEFAULT: [TokenScope; 2] = [TokenScope::VoIP, TokenScope::Chat];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Chat => "chat",
            TokenScope::ChatJoin => "chat.join",
            TokenScope::ChatJoinLimited => "chat.join.limited",
            TokenScope::VoIP => "voip",
            TokenScope::VoIPJoin => "voip.join",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(TokenScope::Chat),
            "chat.join" => Ok(TokenScope::ChatJoin),
            "chat.join.limited" => Ok(TokenScope::ChatJoinLimited),
            "voip" => Ok(TokenScope::VoIP),
            "voip.join" => Ok(TokenScope::VoIPJoin),
            other => Err(format!("unknown token scope '{other}'")),
        }
    }
}
