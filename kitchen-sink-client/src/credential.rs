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

//! Communication token credential.
//!
//! Holds the raw access token handed out by the Identity Issuer. When a
//! [`TokenRefresher`] is attached the token is refreshed lazily: only when
//! [`get_token`](CommunicationTokenCredential::get_token) finds it inside the
//! refresh margin, or when [`refresh`](CommunicationTokenCredential::refresh)
//! is called explicitly. Nothing refreshes on a timer.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use kitchen_sink_types::AccessToken;
use thiserror::Error;

/// Default window before expiry in which a token counts as stale.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential has no refresher")]
    NoRefresher,

    #[error("token refresh failed: {0}")]
    Refresh(String),
}

/// Fetches a replacement token, typically from the Identity Issuer.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<AccessToken, CredentialError>;
}

struct CachedToken {
    token: String,
    expires_on: Option<DateTime<Utc>>,
}

pub struct CommunicationTokenCredential {
    cached: RwLock<CachedToken>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_margin: TimeDelta,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl CommunicationTokenCredential {
    /// Wrap a static token. The string is kept exactly as given.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            cached: RwLock::new(CachedToken {
                token: token.into(),
                expires_on: None,
            }),
            refresher: None,
            refresh_margin: TimeDelta::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Wrap `initial` and refresh it through `refresher` once it goes stale.
    pub fn with_refresher(initial: AccessToken, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            cached: RwLock::new(CachedToken {
                token: initial.token,
                expires_on: Some(initial.expires_on),
            }),
            refresher: Some(refresher),
            refresh_margin: TimeDelta::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_refresh_margin(mut self, margin: TimeDelta) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// The cached token, without refreshing.
    pub fn token(&self) -> String {
        self.read(|cached| cached.token.clone())
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.read(|cached| cached.expires_on)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresher.is_some()
    }

    /// Return a usable token, refreshing first if the cached one is stale.
    pub async fn get_token(&self) -> Result<String, CredentialError> {
        if !self.is_stale(Utc::now()) {
            return Ok(self.token());
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if !self.is_stale(Utc::now()) {
            return Ok(self.token());
        }
        self.refresh_locked().await
    }

    /// Force a refresh regardless of expiry.
    pub async fn refresh(&self) -> Result<String, CredentialError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if self.refresher.is_none() {
            return false;
        }
        self.read(|cached| match cached.expires_on {
            Some(expires_on) => expires_on <= now + self.refresh_margin,
            None => false,
        })
    }

    async fn refresh_locked(&self) -> Result<String, CredentialError> {
        let refresher = self.refresher.as_ref().ok_or(CredentialError::NoRefresher)?;
        let fresh = refresher.refresh().await.map_err(|e| {
            log::error!("Token refresh failed: {e}");
            e
        })?;
        log::debug!("Token refreshed, expires on {}", fresh.expires_on);

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        cached.token = fresh.token.clone();
        cached.expires_on = Some(fresh.expires_on);
        Ok(fresh.token)
    }

    fn read<T>(&self, f: impl FnOnce(&CachedToken) -> T) -> T {
        let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
        f(&cached)
    }
}

impl std::fmt::Debug for CommunicationTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunicationTokenCredential")
            .field("expires_on", &self.expires_on())
            .field("can_refresh", &self.can_refresh())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRefresher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self) -> Result<AccessToken, CredentialError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(CredentialError::Refresh("issuer down".to_string()));
            }
            Ok(AccessToken::new(
                format!("refreshed-{n}"),
                Utc::now() + TimeDelta::hours(1),
            ))
        }
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let raw = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJ4In0.c2ln ";
        let credential = CommunicationTokenCredential::new(raw);
        assert_eq!(credential.token(), raw);
        assert_eq!(credential.get_token().await.unwrap(), raw);
        assert_eq!(
            credential.refresh().await.unwrap_err(),
            CredentialError::NoRefresher
        );
    }

    #[tokio::test]
    async fn fresh_token_is_not_refreshed() {
        let refresher = CountingRefresher::new();
        let credential = CommunicationTokenCredential::with_refresher(
            AccessToken::new("initial", Utc::now() + TimeDelta::hours(2)),
            refresher.clone(),
        );
        assert_eq!(credential.get_token().await.unwrap(), "initial");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_on_demand() {
        let refresher = CountingRefresher::new();
        let credential = CommunicationTokenCredential::with_refresher(
            AccessToken::new("initial", Utc::now() + TimeDelta::seconds(30)),
            refresher.clone(),
        );
        // Nothing happens until someone asks for the token.
        assert_eq!(credential.token(), "initial");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);

        assert_eq!(credential.get_token().await.unwrap(), "refreshed-1");
        assert_eq!(credential.get_token().await.unwrap(), "refreshed-1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn explicit_refresh_always_calls_refresher() {
        let refresher = CountingRefresher::new();
        let credential = CommunicationTokenCredential::with_refresher(
            AccessToken::new("initial", Utc::now() + TimeDelta::hours(2)),
            refresher.clone(),
        );
        assert_eq!(credential.refresh().await.unwrap(), "refreshed-1");
        assert_eq!(credential.token(), "refreshed-1");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_token() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let credential = CommunicationTokenCredential::with_refresher(
            AccessToken::new("initial", Utc::now()),
            refresher,
        );
        assert!(matches!(
            credential.get_token().await,
            Err(CredentialError::Refresh(_))
        ));
        assert_eq!(credential.token(), "initial");
    }

    #[tokio::test]
    async fn margin_is_configurable() {
        let refresher = CountingRefresher::new();
        let credential = CommunicationTokenCredential::with_refresher(
            AccessToken::new("initial", Utc::now() + TimeDelta::seconds(30)),
            refresher.clone(),
        )
        .with_refresh_margin(TimeDelta::seconds(5));
        assert_eq!(credential.get_token().await.unwrap(), "initial");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }
}
