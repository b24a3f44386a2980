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

//! Axum router configuration for the Identity Issuer.

pub mod identity;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Build the application router. Lowercase aliases are served as well.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/Identity", get(identity::create_identity))
        .route("/Identity/token", get(identity::refresh_token))
        .route("/identity", get(identity::create_identity))
        .route("/identity/token", get(identity::refresh_token))
}
