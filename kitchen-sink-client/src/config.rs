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

//! Client configuration and callee validation.

use std::env;
use std::str::FromStr;

use chrono::TimeDelta;
use kitchen_sink_types::{identifier::COMMUNICATION_USER_ID_LEN, CommunicationUserId};

use crate::credential::DEFAULT_REFRESH_MARGIN_SECS;

pub const DEFAULT_IDENTITY_API_URL: &str = "http://localhost:8080";

/// How the callee text field is checked before start-call is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalleeValidation {
    /// The raw input must be exactly 79 characters long.
    #[default]
    Length,
    /// The trimmed input must be a well-formed `8:acs:<guid>_<guid>` id.
    Strict,
}

impl CalleeValidation {
    pub fn accepts(&self, raw: &str) -> bool {
        match self {
            CalleeValidation::Length => raw.chars().count() == COMMUNICATION_USER_ID_LEN,
            CalleeValidation::Strict => raw.trim().parse::<CommunicationUserId>().is_ok(),
        }
    }
}

impl FromStr for CalleeValidation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length" => Ok(CalleeValidation::Length),
            "strict" => Ok(CalleeValidation::Strict),
            other => Err(format!("unknown callee validation mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub identity_api_url: String,
    pub callee_validation: CalleeValidation,
    pub token_refresh_margin: TimeDelta,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity_api_url: DEFAULT_IDENTITY_API_URL.to_string(),
            callee_validation: CalleeValidation::default(),
            token_refresh_margin: TimeDelta::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional
    /// - `IDENTITY_API_URL` (default: `"http://localhost:8080"`)
    /// - `CALLEE_VALIDATION` (`length` or `strict`, default: `length`)
    /// - `TOKEN_REFRESH_MARGIN_SECS` (default: `"300"`)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let identity_api_url = var("IDENTITY_API_URL").unwrap_or(defaults.identity_api_url);
        let callee_validation = match var("CALLEE_VALIDATION") {
            Some(raw) => raw.parse()?,
            None => defaults.callee_validation,
        };
        let token_refresh_margin = match var("TOKEN_REFRESH_MARGIN_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| "TOKEN_REFRESH_MARGIN_SECS must be a valid integer")?;
                if secs < 0 {
                    return Err("TOKEN_REFRESH_MARGIN_SECS must not be negative".to_string());
                }
                TimeDelta::seconds(secs)
            }
            None => defaults.token_refresh_margin,
        };

        Ok(Self {
            identity_api_url,
            callee_validation,
            token_refresh_margin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const VALID: &str =
        "8:acs:3f1c9a52-7d1e-4b7a-9e0c-5a2f4c7b8d10_9b2e4f6a-1c3d-4e5f-8a7b-6c5d4e3f2a1b";

    fn load(pairs: &[(&str, &str)]) -> Result<ClientConfig, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn length_rule_counts_raw_characters() {
        let rule = CalleeValidation::Length;
        assert_eq!(VALID.len(), 79);
        assert!(rule.accepts(VALID));
        assert!(!rule.accepts(&VALID[..78]));
        assert!(!rule.accepts(&format!("{VALID} ")));
        // Anything of the right length passes; the format is not checked.
        assert!(rule.accepts(&"x".repeat(79)));
    }

    #[test]
    fn strict_rule_checks_format() {
        let rule = CalleeValidation::Strict;
        assert!(rule.accepts(VALID));
        assert!(rule.accepts(&format!(" {VALID} ")));
        assert!(!rule.accepts(&"x".repeat(79)));
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[]).unwrap();
        assert_eq!(config.identity_api_url, DEFAULT_IDENTITY_API_URL);
        assert_eq!(config.callee_validation, CalleeValidation::Length);
        assert_eq!(config.token_refresh_margin, TimeDelta::seconds(300));
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("IDENTITY_API_URL", "http://issuer:9000"),
            ("CALLEE_VALIDATION", "Strict"),
            ("TOKEN_REFRESH_MARGIN_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.identity_api_url, "http://issuer:9000");
        assert_eq!(config.callee_validation, CalleeValidation::Strict);
        assert_eq!(config.token_refresh_margin, TimeDelta::seconds(60));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("CALLEE_VALIDATION", "fuzzy")]).is_err());
        assert!(load(&[("TOKEN_REFRESH_MARGIN_SECS", "soon")]).is_err());
        assert!(load(&[("TOKEN_REFRESH_MARGIN_SECS", "-1")]).is_err());
    }
}
