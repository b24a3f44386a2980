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

//! Communication user identifiers.
//!
//! A user minted by the identity service looks like
//! `8:acs:<resource-guid>_<user-guid>`: a six character prefix, two
//! hyphenated GUIDs and an underscore, 79 characters in total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix shared by every communication user id.
pub const ACS_USER_PREFIX: &str = "8:acs:";

/// Length of a well-formed communication user id.
pub const COMMUNICATION_USER_ID_LEN: usize = 79;

const GUID_LEN: usize = 36;

/// Why a string is not a communication user id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("expected {len} characters, got {0}", len = COMMUNICATION_USER_ID_LEN)]
    WrongLength(usize),

    #[error("missing '{prefix}' prefix", prefix = ACS_USER_PREFIX)]
    MissingPrefix,

    #[error("missing '_' between resource and user")]
    MissingSeparator,

    #[error("'{0}' is not a GUID")]
    InvalidGuid(String),
}

/// A validated `8:acs:<guid>_<guid>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommunicationUserId(String);

impl CommunicationUserId {
    /// Mint a new user id under the given resource.
    pub fn generate(resource_id: Uuid) -> Self {
        Self(format!(
            "{ACS_USER_PREFIX}{}_{}",
            resource_id.hyphenated(),
            Uuid::new_v4().hyphenated()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resource GUID half of the id.
    pub fn resource_id(&self) -> &str {
        &self.0[ACS_USER_PREFIX.len()..ACS_USER_PREFIX.len() + GUID_LEN]
    }
}

impl FromStr for CommunicationUserId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != COMMUNICATION_USER_ID_LEN {
            return Err(IdentifierError::WrongLength(s.len()));
        }
        let rest = s
            .strip_prefix(ACS_USER_PREFIX)
            .ok_or(IdentifierError::MissingPrefix)?;
        let (resource, user) = rest
            .split_once('_')
            .ok_or(IdentifierError::MissingSeparator)?;
        for part in [resource, user] {
            if part.len() != GUID_LEN || Uuid::parse_str(part).is_err() {
                return Err(IdentifierError::InvalidGuid(part.to_string()));
            }
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for CommunicationUserId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommunicationUserId> for String {
    fn from(id: CommunicationUserId) -> Self {
        id.0
    }
}

impl fmt::Display for CommunicationUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
