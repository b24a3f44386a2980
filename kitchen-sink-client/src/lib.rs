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

//! Calling client for the ACS kitchen sink.
//!
//! The calling SDK itself (signaling, media, call-state transitions) sits
//! behind the traits in [`sdk`]. This crate wires user actions to those
//! traits and mirrors what the SDK reports into a store that view layers
//! read from.
//!
//! # Outline of usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use kitchen_sink_client::{
//!     bootstrap, spawn_store, AppState, ClientConfig, IdentityApiClient, LoopbackCallClient,
//!     LoopbackNetwork, VoipController, VoipView,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let (store, _task) = spawn_store(AppState::new(config.callee_validation));
//!
//! let identity = Arc::new(IdentityApiClient::new(&config.identity_api_url));
//! let sdk = LoopbackCallClient::new(LoopbackNetwork::new());
//! let session = bootstrap(identity, &sdk, &store, config.token_refresh_margin).await?;
//!
//! let controller = VoipController::start(&session, store.clone(), config.callee_validation);
//! controller.set_callee("8:acs:...");
//! println!("{}", VoipView::from_state(&store.snapshot()));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod credential;
pub mod loopback;
pub mod mirror;
pub mod sdk;
pub mod session;
pub mod store;
pub mod view;

pub use config::{CalleeValidation, ClientConfig};
pub use controller::{CallError, VoipController};
pub use credential::{CommunicationTokenCredential, CredentialError, TokenRefresher};
pub use identity_client::IdentityApiClient;
pub use loopback::{LoopbackCallClient, LoopbackNetwork};
pub use mirror::CallMirror;
pub use session::{bootstrap, IdentitySource, Session, SessionError};
pub use store::{spawn_store, Action, AppState, Dispatch, StoreHandle};
pub use view::{IdentityBadge, VoipView};
