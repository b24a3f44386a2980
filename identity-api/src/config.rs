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

//! Application configuration loaded from environment variables.

use std::env;

use kitchen_sink_types::TokenScope;
use uuid::Uuid;

/// Default ACS Identity REST API version.
pub const DEFAULT_ACS_API_VERSION: &str = "2023-10-01";

/// Configuration for the Identity Issuer API.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server (e.g. "0.0.0.0:8080").
    pub listen_addr: String,
    /// Which identity service backs `GET /Identity`.
    pub issuer: IssuerConfig,
    /// Scopes requested for every token (default: voip, chat).
    pub scopes: Vec<TokenScope>,
}

/// Backing identity service.
#[derive(Debug, Clone)]
pub enum IssuerConfig {
    /// Azure Communication Services, authenticated with a resource connection string.
    Acs {
        connection_string: String,
        api_version: String,
    },
    /// Local development issuer signing HS256 tokens.
    Local {
        jwt_secret: String,
        /// Token time-to-live in seconds (default: 86400 = 24 hours).
        token_ttl_secs: i64,
        /// Resource GUID embedded in minted user ids.
        resource_id: Uuid,
    },
}

impl IssuerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            IssuerConfig::Acs { .. } => "ACS",
            IssuerConfig::Local { .. } => "local",
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required (one of)
    /// - `ACS_CONNECTION_STRING` (`endpoint=https://...;accesskey=...`)
    /// - `JWT_SECRET` (local development issuer)
    ///
    /// # Optional
    /// - `LISTEN_ADDR` (default: `"0.0.0.0:8080"`)
    /// - `TOKEN_SCOPES` (default: `"voip,chat"`)
    /// - `ACS_API_VERSION` (default: `"2023-10-01"`)
    /// - `TOKEN_TTL_SECS` (default: `"86400"`, local issuer only)
    /// - `LOCAL_RESOURCE_ID` (default: random, local issuer only)
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = var("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let scopes = match var("TOKEN_SCOPES") {
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse::<TokenScope>)
                .collect::<Result<Vec<_>, _>>()?,
            None => TokenScope::DEFAULT.to_vec(),
        };
        if scopes.is_empty() {
            return Err("TOKEN_SCOPES must name at least one scope".to_string());
        }

        let issuer = if let Some(connection_string) = var("ACS_CONNECTION_STRING") {
            IssuerConfig::Acs {
                connection_string,
                api_version: var("ACS_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_ACS_API_VERSION.to_string()),
            }
        } else {
            let jwt_secret = var("JWT_SECRET")
                .ok_or("either ACS_CONNECTION_STRING or JWT_SECRET environment variable is required")?;
            let token_ttl_secs = var("TOKEN_TTL_SECS")
                .unwrap_or_else(|| "86400".to_string())
                .parse::<i64>()
                .map_err(|_| "TOKEN_TTL_SECS must be a valid integer")?;
            let resource_id = match var("LOCAL_RESOURCE_ID") {
                Some(raw) => Uuid::parse_str(raw.trim())
                    .map_err(|_| "LOCAL_RESOURCE_ID must be a GUID")?,
                None => Uuid::new_v4(),
            };
            IssuerConfig::Local {
                jwt_secret,
                token_ttl_secs,
                resource_id,
            }
        };

        Ok(Self {
            listen_addr,
            issuer,
            scopes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn requires_an_issuer() {
        let err = load(&[]).unwrap_err();
        assert!(err.contains("ACS_CONNECTION_STRING"));
    }

    #[test]
    fn connection_string_selects_acs() {
        let config = load(&[
            ("ACS_CONNECTION_STRING", "endpoint=https://x.communication.azure.com/;accesskey=a2V5"),
            ("JWT_SECRET", "ignored"),
        ])
        .unwrap();
        match config.issuer {
            IssuerConfig::Acs { api_version, .. } => {
                assert_eq!(api_version, DEFAULT_ACS_API_VERSION)
            }
            other => panic!("expected ACS issuer, got {other:?}"),
        }
        assert_eq!(config.scopes, TokenScope::DEFAULT.to_vec());
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn local_issuer_defaults() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        match config.issuer {
            IssuerConfig::Local { token_ttl_secs, .. } => assert_eq!(token_ttl_secs, 86400),
            other => panic!("expected local issuer, got {other:?}"),
        }
    }

    #[test]
    fn parses_scopes_and_rejects_unknown() {
        let config = load(&[("JWT_SECRET", "s"), ("TOKEN_SCOPES", "voip, chat.join")]).unwrap();
        assert_eq!(config.scopes, vec![TokenScope::VoIP, TokenScope::ChatJoin]);

        let err = load(&[("JWT_SECRET", "s"), ("TOKEN_SCOPES", "voip,video")]).unwrap_err();
        assert!(err.contains("video"));
    }

    #[test]
    fn rejects_bad_ttl() {
        let err = load(&[("JWT_SECRET", "s"), ("TOKEN_TTL_SECS", "soon")]).unwrap_err();
        assert!(err.contains("TOKEN_TTL_SECS"));
    }
}
