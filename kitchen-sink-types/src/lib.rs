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

//! Shared API types for the kitchen-sink identity service.
//!
//! This crate defines the contract between the Identity Issuer and its
//! consumers (the calling client, the CLI, integration tests). It carries no
//! HTTP framework types.

pub mod error;
pub mod identifier;
pub mod identity;
pub mod requests;
pub mod responses;
pub mod token;

pub use error::APIError;
pub use identifier::{CommunicationUserId, IdentifierError};
pub use identity::{AccessToken, CommunicationUser, Identity, TokenScope};
pub use responses::APIResponse;
pub use token::CommunicationTokenClaims;
