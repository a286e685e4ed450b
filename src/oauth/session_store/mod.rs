// ABOUTME: OAuth session store abstraction correlating callbacks with their login attempt
// ABOUTME: Pluggable backends (in-memory, Redis) selected from configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! `OAuth` session stores
//!
//! A session maps the `state` sent to the provider onto the `PKCE` verifier kept
//! server side. Sessions are single use and expire after a TTL whether or not they
//! are ever deleted: every read checks the age against the injected clock.

/// Process-local LRU backend
pub mod memory;
/// Shared Redis backend
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{SessionBackend, SessionStoreConfig};
use crate::utils::clock::Clock;

use super::OAuthError;

pub use self::memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;

/// One in-flight authorization attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthSession {
    /// Correlation value sent to the provider
    pub state: String,
    /// `PKCE` verifier proving this server started the attempt
    pub code_verifier: String,
    /// When the attempt started
    pub created_at: DateTime<Utc>,
}

impl OAuthSession {
    /// Create a session started at `created_at`
    #[must_use]
    pub const fn new(state: String, code_verifier: String, created_at: DateTime<Utc>) -> Self {
        Self {
            state,
            code_verifier,
            created_at,
        }
    }

    /// Whether the session is at least `ttl` old at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !chrono::Duration::from_std(ttl).is_ok_and(|ttl| now < self.created_at + ttl)
    }
}

/// Storage for in-flight `OAuth` sessions
///
/// Every read treats sessions older than the store's TTL as absent.
#[async_trait]
pub trait OAuthSessionStore: Send + Sync {
    /// Backend name used in logs
    fn backend_name(&self) -> &'static str;

    /// Store a session under `state`
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::SessionStore`] if the backend fails
    async fn put(&self, state: &str, session: OAuthSession) -> Result<(), OAuthError>;

    /// Look up a live session without consuming it
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::SessionStore`] if the backend fails
    async fn get(&self, state: &str) -> Result<Option<OAuthSession>, OAuthError>;

    /// Remove a session
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::SessionStore`] if the backend fails
    async fn delete(&self, state: &str) -> Result<(), OAuthError>;

    /// Atomically fetch and remove a live session
    ///
    /// At most one caller ever receives a given session.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::SessionStore`] if the backend fails
    async fn consume(&self, state: &str) -> Result<Option<OAuthSession>, OAuthError>;
}

/// Create the session store selected by configuration
///
/// # Errors
///
/// Returns an error if the Redis backend is selected without a URL or cannot connect
pub async fn create_session_store(
    config: &SessionStoreConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn OAuthSessionStore>, OAuthError> {
    match config.backend {
        SessionBackend::Memory => {
            info!(
                max_entries = config.max_entries,
                ttl_secs = config.ttl_secs,
                "Using in-memory OAuth session store (single instance)"
            );
            Ok(Arc::new(InMemorySessionStore::new(config, clock)))
        }
        SessionBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                OAuthError::Configuration("REDIS_URL is required for the redis session store".into())
            })?;
            info!(ttl_secs = config.ttl_secs, "Using Redis OAuth session store");
            let store = RedisSessionStore::connect(url, Duration::from_secs(config.ttl_secs), clock)
                .await?;
            Ok(Arc::new(store))
        }
    }
}
