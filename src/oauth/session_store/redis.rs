// ABOUTME: Redis OAuth session store with native TTL and atomic GETDEL consumption
// ABOUTME: Shares in-flight sessions across broker instances behind a load balancer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{error, info};

use super::{OAuthSession, OAuthSessionStore};
use crate::constants::oauth::REDIS_SESSION_KEY_PREFIX;
use crate::oauth::OAuthError;
use crate::utils::clock::Clock;

/// Redis session store
///
/// Uses `ConnectionManager` for automatic reconnection. Sessions are written with
/// `SET .. EX` so Redis expires them on its own; reads still apply the TTL against
/// the injected clock.
#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RedisSessionStore {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::SessionStore`] if the URL is invalid or the connection fails
    pub async fn connect(
        redis_url: &str,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OAuthError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| OAuthError::SessionStore(format!("Failed to create Redis client: {e}")))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| OAuthError::SessionStore(format!("Failed to connect to Redis: {e}")))?;

        info!("Connected to Redis OAuth session store");
        Ok(Self {
            manager,
            ttl,
            clock,
        })
    }

    fn build_key(state: &str) -> String {
        format!("{REDIS_SESSION_KEY_PREFIX}{state}")
    }

    fn decode(&self, raw: Option<Vec<u8>>) -> Result<Option<OAuthSession>, OAuthError> {
        let Some(bytes) = raw else {
            return Ok(None);
        };
        let session: OAuthSession = serde_json::from_slice(&bytes)
            .map_err(|e| OAuthError::SessionStore(format!("Corrupt OAuth session: {e}")))?;
        Ok(Some(session).filter(|s| !s.is_expired_at(self.clock.now(), self.ttl)))
    }
}

fn store_error(operation: &str, e: &redis::RedisError) -> OAuthError {
    error!("Redis {} operation failed: {}", operation, e);
    OAuthError::SessionStore(format!("Redis {operation} failed: {e}"))
}

#[async_trait]
impl OAuthSessionStore for RedisSessionStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn put(&self, state: &str, session: OAuthSession) -> Result<(), OAuthError> {
        let payload = serde_json::to_vec(&session)
            .map_err(|e| OAuthError::SessionStore(format!("Session serialization failed: {e}")))?;
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(Self::build_key(state), payload, self.ttl.as_secs().max(1))
            .await
            .map_err(|e| store_error("SET", &e))
    }

    async fn get(&self, state: &str) -> Result<Option<OAuthSession>, OAuthError> {
        let mut conn = self.manager.clone();
        let raw: Option<Vec<u8>> = conn
            .get(Self::build_key(state))
            .await
            .map_err(|e| store_error("GET", &e))?;
        self.decode(raw)
    }

    async fn delete(&self, state: &str) -> Result<(), OAuthError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(Self::build_key(state))
            .await
            .map_err(|e| store_error("DEL", &e))
    }

    async fn consume(&self, state: &str) -> Result<Option<OAuthSession>, OAuthError> {
        let mut conn = self.manager.clone();
        // GETDEL is atomic: concurrent callbacks with the same state cannot both succeed
        let raw: Option<Vec<u8>> = redis::cmd("GETDEL")
            .arg(Self::build_key(state))
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("GETDEL", &e))?;
        self.decode(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(
            RedisSessionStore::build_key("abc123"),
            "fleet_auth:oauth_session:abc123"
        );
    }
}
