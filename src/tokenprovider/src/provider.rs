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
use crate::errors;
use crate::token::Token;
use crate::token_cache::TokenCache;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;

/// The capability implemented by every token source in this crate.
///
/// Sources do not cache, nor retry. The [TokenProvider] wrapping them owns
/// the caching behavior.
#[async_trait::async_trait]
pub trait CacheableSource: std::fmt::Debug + Send + Sync {
    /// Returns a key identifying the tokens produced by this source.
    ///
    /// The key is computed once, at construction time, and never changes.
    /// Sources with equal keys produce interchangeable tokens.
    fn cache_key(&self) -> &str;

    /// Fetches a new token.
    ///
    /// Dropping the returned future cancels the request.
    async fn token(&self) -> Result<Token>;
}

/// A token provider: a [CacheableSource] fronted by a [TokenCache].
///
/// `TokenProvider` is cheap to clone, clones share the source and the cache.
#[derive(Clone, Debug)]
pub struct TokenProvider {
    source: Arc<dyn CacheableSource>,
    cache: TokenCache,
}

impl TokenProvider {
    /// Creates a provider for `source`, with its own cache.
    pub fn new<T>(source: T) -> Self
    where
        T: CacheableSource + 'static,
    {
        Self::with_cache(source, TokenCache::new())
    }

    /// Creates a provider for `source`, storing tokens in `cache`.
    pub fn with_cache<T>(source: T, cache: TokenCache) -> Self
    where
        T: CacheableSource + 'static,
    {
        Self {
            source: Arc::new(source),
            cache,
        }
    }

    /// The cache key of the underlying source.
    pub fn cache_key(&self) -> &str {
        self.source.cache_key()
    }

    /// Returns a valid token, fetching a new one if needed.
    pub async fn token(&self) -> Result<Token> {
        let key = self.source.cache_key();
        self.cache
            .get_or_refresh(key, || async {
                tracing::debug!("fetching a new token for {key}");
                self.source.token().await.inspect_err(|e| {
                    tracing::warn!("cannot fetch a token for {key}: {e}");
                })
            })
            .await
    }

    /// Returns the `Authorization` header for the current token.
    ///
    /// The header value is marked as sensitive.
    pub async fn headers(&self) -> Result<HeaderMap> {
        let token = self.token().await?;
        let mut value = HeaderValue::from_str(&format!("{} {}", token.token_type, token.token))
            .map_err(errors::non_retryable)?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}
