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

//! Identity Issuer server entry point.
//!
//! A standalone Axum service that mints communication users and access
//! tokens for the calling client.

use identity_api::config::Config;
use identity_api::issuer::build_issuer;
use identity_api::routes;
use identity_api::state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("failed to load configuration");

    let issuer = build_issuer(&config).expect("failed to configure identity issuer");

    tracing::info!("Using {} identity issuer", config.issuer.kind());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(issuer, &config);
    let app = routes::router().layer(cors).with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listener");

    tracing::info!("Identity Issuer listening on {}", config.listen_addr);

    axum::serve(listener, app).await.expect("server error");
}
