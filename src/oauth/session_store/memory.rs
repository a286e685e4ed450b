// ABOUTME: In-memory OAuth session store with LRU eviction and TTL enforcement
// ABOUTME: Includes a background sweep that evicts expired sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::{OAuthSession, OAuthSessionStore};
use crate::config::SessionStoreConfig;
use crate::oauth::OAuthError;
use crate::utils::clock::Clock;

type SessionMap = Arc<RwLock<LruCache<String, OAuthSession>>>;

/// In-memory session store for single-instance deployments
///
/// Uses `Arc<RwLock<LruCache>>` so the background sweep can share the map. The LRU
/// bound caps memory when attempts are started and never completed.
pub struct InMemorySessionStore {
    sessions: SessionMap,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl InMemorySessionStore {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a store, starting the background sweep when a tokio runtime is available
    #[must_use]
    pub fn new(config: &SessionStoreConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let sessions: SessionMap = Arc::new(RwLock::new(LruCache::new(capacity)));
        let ttl = Duration::from_secs(config.ttl_secs);

        let shutdown_tx = if config.cleanup_interval_secs > 0
            && tokio::runtime::Handle::try_current().is_ok()
        {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            let sessions_clone = Arc::clone(&sessions);
            let clock_clone = Arc::clone(&clock);
            let cleanup_interval = Duration::from_secs(config.cleanup_interval_secs);

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&sessions_clone, clock_clone.as_ref(), ttl).await;
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("OAuth session sweep received shutdown signal");
                            break;
                        }
                    }
                }
            });
            Some(shutdown_tx)
        } else {
            None
        };

        Self {
            sessions,
            ttl,
            clock,
            shutdown_tx,
        }
    }

    /// Number of stored sessions, expired ones included until swept
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove every expired session now
    pub async fn purge_expired(&self) -> usize {
        Self::cleanup_expired(&self.sessions, self.clock.as_ref(), self.ttl).await
    }

    async fn cleanup_expired(sessions: &SessionMap, clock: &dyn Clock, ttl: Duration) -> usize {
        let now = clock.now();
        let mut guard = sessions.write().await;

        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, session)| session.is_expired_at(now, ttl))
            .map(|(state, _)| state.clone())
            .collect();

        for state in &expired {
            guard.pop(state);
        }
        drop(guard);

        if !expired.is_empty() {
            debug!("Evicted {} expired OAuth sessions", expired.len());
        }
        expired.len()
    }
}

#[async_trait]
impl OAuthSessionStore for InMemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, state: &str, session: OAuthSession) -> Result<(), OAuthError> {
        self.sessions.write().await.put(state.to_owned(), session);
        Ok(())
    }

    async fn get(&self, state: &str) -> Result<Option<OAuthSession>, OAuthError> {
        let now = self.clock.now();
        let guard = self.sessions.read().await;
        Ok(guard
            .peek(state)
            .filter(|session| !session.is_expired_at(now, self.ttl))
            .cloned())
    }

    async fn delete(&self, state: &str) -> Result<(), OAuthError> {
        self.sessions.write().await.pop(state);
        Ok(())
    }

    async fn consume(&self, state: &str) -> Result<Option<OAuthSession>, OAuthError> {
        let now = self.clock.now();
        let removed = self.sessions.write().await.pop(state);
        Ok(removed.filter(|session| !session.is_expired_at(now, self.ttl)))
    }
}

impl Drop for InMemorySessionStore {
    fn drop(&mut self) {
        if let Some(tx) = &self.shutdown_tx {
            if let Err(e) = tx.try_send(()) {
                debug!(error = ?e, "OAuth session sweep shutdown signal not delivered");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::DateTime;

    fn store(clock: Arc<ManualClock>, max_entries: usize) -> InMemorySessionStore {
        let config = SessionStoreConfig {
            max_entries,
            cleanup_interval_secs: 0,
            ..SessionStoreConfig::default()
        };
        InMemorySessionStore::new(&config, clock)
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let clock = clock();
        let store = store(Arc::clone(&clock), 100);
        let session = OAuthSession::new("state-1".into(), "verifier".into(), clock.now());
        store.put("state-1", session.clone()).await.unwrap();

        assert_eq!(store.get("state-1").await.unwrap(), Some(session.clone()));
        assert_eq!(store.consume("state-1").await.unwrap(), Some(session));
        assert_eq!(store.consume("state-1").await.unwrap(), None);
        assert_eq!(store.get("state-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_session_is_absent_without_deletion() {
        let clock = clock();
        let store = store(Arc::clone(&clock), 100);
        store
            .put(
                "state-2",
                OAuthSession::new("state-2".into(), "verifier".into(), clock.now()),
            )
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(601));
        assert_eq!(store.get("state-2").await.unwrap(), None);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.consume("state-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_evicts_only_expired() {
        let clock = clock();
        let store = store(Arc::clone(&clock), 100);
        store
            .put("old", OAuthSession::new("old".into(), "v".into(), clock.now()))
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(300));
        store
            .put("new", OAuthSession::new("new".into(), "v".into(), clock.now()))
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(400));

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.get("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let clock = clock();
        let store = store(Arc::clone(&clock), 2);
        for state in ["a", "b", "c"] {
            store
                .put(state, OAuthSession::new(state.into(), "v".into(), clock.now()))
                .await
                .unwrap();
        }

        assert_eq!(store.len().await, 2);
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
    }
}
