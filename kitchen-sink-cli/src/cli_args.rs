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

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use url::Url;

/// ACS Kitchen Sink CLI
///
/// Talks to a running Identity Issuer. `identity` mints a user and prints its
/// token; `demo` signs in two users and calls one from the other over the
/// in-process loopback calling stack.
#[derive(Parser, Debug)]
#[clap(name = "kitchen-sink")]
pub struct Opt {
    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Fetch a new identity and print it.
    Identity(IdentityArgs),

    /// Place a loopback call between two freshly issued identities.
    Demo(DemoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// Identity Issuer base URL. Falls back to `IDENTITY_API_URL`.
    #[clap(long = "url")]
    pub url: Option<Url>,

    /// Also exercise `GET /Identity/token` for the new user.
    #[clap(long = "refresh")]
    pub refresh: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Identity Issuer base URL. Falls back to `IDENTITY_API_URL`.
    #[clap(long = "url")]
    pub url: Option<Url>,

    /// The callee answers without a camera.
    #[clap(long = "no-camera")]
    pub no_camera: bool,

    /// How long to stay connected before hanging up, e.g. `2s` or `500ms`.
    #[arg(long = "hold", default_value = "1s", value_parser = parse_duration)]
    pub hold: Duration,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("Invalid duration '{0}', expected e.g. 500ms or 2s")]
    Invalid(String),
}

fn parse_duration(s: &str) -> Result<Duration, ParseDurationError> {
    let s = s.trim();
    let invalid = || ParseDurationError::Invalid(s.to_string());
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.parse().map(Duration::from_millis).map_err(|_| invalid());
    }
    let secs = s.strip_suffix('s').unwrap_or(s);
    secs.parse().map(Duration::from_secs).map_err(|_| invalid())
}
