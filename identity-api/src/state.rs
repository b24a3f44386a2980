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

//! Shared application state passed to every Axum handler via `State`.

use std::sync::Arc;

use kitchen_sink_types::TokenScope;

use crate::config::Config;
use crate::issuer::IdentityIssuer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Managed identity service (or the local development issuer).
    pub issuer: Arc<dyn IdentityIssuer>,
    /// Scopes requested for every issued token.
    pub scopes: Vec<TokenScope>,
}

impl AppState {
    pub fn new(issuer: Arc<dyn IdentityIssuer>, config: &Config) -> Self {
        Self {
            issuer,
            scopes: config.scopes.clone(),
        }
    }
}
