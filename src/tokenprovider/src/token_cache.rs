// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Result;
use crate::token::Token;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
// Using tokio's wrapper makes the cache testable without relying on clock times.
use tokio::time::Instant;

/// Tokens expiring within this margin are refreshed.
pub(crate) const EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// A store of tokens, indexed by cache key.
///
/// Cloning a `TokenCache` returns a handle to the same store. Providers that
/// share a store, and whose sources report the same cache key, share their
/// tokens.
///
/// Only successful fetches are stored. Refreshes are single-flight per key:
/// while one caller fetches a token, other callers for the same key wait for
/// that fetch to complete.
#[derive(Clone, Debug, Default)]
pub struct TokenCache {
    slots: Arc<Mutex<HashMap<String, Arc<Slot>>>>,
}

// The lock is held for the duration of a refresh.
type Slot = Mutex<Option<Token>>;

impl TokenCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token for `key`, calling `refresh` when there is
    /// no valid token.
    ///
    /// Dropping the returned future cancels the refresh, and leaves the cache
    /// unchanged.
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, refresh: F) -> Result<Token>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Token>>,
    {
        let slot = self.slot(key).await;
        let mut cached = slot.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| is_valid(t)) {
            tracing::debug!("serving token for {key} from the cache");
            return Ok(token.clone());
        }

        let token = refresh().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Removes `key` and its cached token, if any.
    pub async fn invalidate(&self, key: &str) {
        let slot = self.slots.lock().await.remove(key);
        // A refresh in progress may still hold the removed slot.
        if let Some(slot) = slot {
            *slot.lock().await = None;
        }
    }

    async fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().await;
        slots.entry(key.to_string()).or_default().clone()
    }
}

fn is_valid(token: &Token) -> bool {
    token
        .expires_at
        .is_none_or(|e| e > Instant::now() + EXPIRY_MARGIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredentialsError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TOKEN_VALID_DURATION: Duration = Duration::from_secs(3600);

    fn token(value: &str, expires_at: Option<Instant>) -> Token {
        Token {
            token: value.to_string(),
            token_type: "Bearer".to_string(),
            expires_at,
            metadata: None,
        }
    }

    async fn unexpected_refresh() -> Result<Token> {
        Err(CredentialsError::from_msg(false, "unexpected refresh"))
    }

    #[tokio::test]
    async fn initial_token_success() {
        let expected = token("test-token", None);
        let calls = AtomicUsize::new(0);
        let cache = TokenCache::new();

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(expected.clone())
        };
        let actual = cache.get_or_refresh("key", fetch).await.unwrap();
        assert_eq!(actual, expected);

        // Verify that we use the cached token instead of making a new request.
        let actual = cache.get_or_refresh("key", fetch).await.unwrap();
        assert_eq!(actual, expected);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn initial_token_failure() {
        let calls = AtomicUsize::new(0);
        let cache = TokenCache::new();
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CredentialsError::from_msg(false, "fail"))
        };

        assert!(cache.get_or_refresh("key", fetch).await.is_err());
        // Errors are not cached, the next call fetches again.
        assert!(cache.get_or_refresh("key", fetch).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_success() {
        let now = Instant::now();
        let initial = token("initial-token", Some(now + TOKEN_VALID_DURATION));
        let refresh = token("refresh-token", Some(now + 2 * TOKEN_VALID_DURATION));

        let cache = TokenCache::new();
        let actual = cache
            .get_or_refresh("key", || async { Ok(initial.clone()) })
            .await
            .unwrap();
        assert_eq!(actual, initial);

        // Still valid, the refresh function is not called.
        tokio::time::advance(TOKEN_VALID_DURATION / 2).await;
        let actual = cache
            .get_or_refresh("key", unexpected_refresh)
            .await
            .unwrap();
        assert_eq!(actual, initial);

        tokio::time::advance(TOKEN_VALID_DURATION / 2).await;
        let actual = cache
            .get_or_refresh("key", || async { Ok(refresh.clone()) })
            .await
            .unwrap();
        assert_eq!(actual, refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_within_expiry_margin() {
        let now = Instant::now();
        let initial = token("initial-token", Some(now + TOKEN_VALID_DURATION));
        let refresh = token("refresh-token", Some(now + 2 * TOKEN_VALID_DURATION));

        let cache = TokenCache::new();
        cache
            .get_or_refresh("key", || async { Ok(initial.clone()) })
            .await
            .unwrap();

        tokio::time::advance(TOKEN_VALID_DURATION - EXPIRY_MARGIN).await;
        let actual = cache
            .get_or_refresh("key", || async { Ok(refresh.clone()) })
            .await
            .unwrap();
        assert_eq!(actual, refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_failure() {
        let now = Instant::now();
        let initial = token("initial-token", Some(now + TOKEN_VALID_DURATION));

        let cache = TokenCache::new();
        cache
            .get_or_refresh("key", || async { Ok(initial.clone()) })
            .await
            .unwrap();

        tokio::time::advance(TOKEN_VALID_DURATION).await;

        // Make sure we return the error, not the expired token.
        let err = cache
            .get_or_refresh("key", || async {
                Err(CredentialsError::from_msg(true, "fail"))
            })
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "{err}");
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = TokenCache::new();
        let a = cache
            .get_or_refresh("jwt:a", || async { Ok(token("token-a", None)) })
            .await
            .unwrap();
        let b = cache
            .get_or_refresh("jwt:b", || async { Ok(token("token-b", None)) })
            .await
            .unwrap();
        assert_eq!(a.token, "token-a");
        assert_eq!(b.token, "token-b");
    }

    #[tokio::test]
    async fn clones_share_tokens() {
        let cache = TokenCache::new();
        let clone = cache.clone();
        cache
            .get_or_refresh("key", || async { Ok(token("shared-token", None)) })
            .await
            .unwrap();
        let actual = clone
            .get_or_refresh("key", unexpected_refresh)
            .await
            .unwrap();
        assert_eq!(actual.token, "shared-token");
    }

    #[tokio::test]
    async fn invalidate() {
        let cache = TokenCache::new();
        cache
            .get_or_refresh("key", || async { Ok(token("initial-token", None)) })
            .await
            .unwrap();
        cache.invalidate("key").await;
        cache.invalidate("missing-key").await;
        assert!(cache.slots.lock().await.is_empty());
        let actual = cache
            .get_or_refresh("key", || async { Ok(token("refresh-token", None)) })
            .await
            .unwrap();
        assert_eq!(actual.token, "refresh-token");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_refresh_leaves_cache_unchanged() {
        let cache = TokenCache::new();
        let pending = cache.get_or_refresh("key", || std::future::pending::<Result<Token>>());
        let result = tokio::time::timeout(Duration::from_secs(5), pending).await;
        assert!(result.is_err(), "the refresh should time out");

        // The slot lock was released when the future was dropped.
        let actual = cache
            .get_or_refresh("key", || async { Ok(token("test-token", None)) })
            .await
            .unwrap();
        assert_eq!(actual.token, "test-token");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn initial_token_thundering_herd_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = TokenCache::new();

        // Spawn N tasks, all asking for a token at once.
        let tasks = (0..100)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_refresh("key", || async move {
                            // Give the waiters enough time to pile up.
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(token("initial-token", None))
                        })
                        .await
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let actual = task.await.unwrap();
            assert_eq!(actual.unwrap().token, "initial-token");
        }

        // A token without expiry is fetched exactly once.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
