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

//! Access token provider for service account JWT configurations.
//!
//! The provider signs a JWT assertion with the service account private key
//! and exchanges it for an OAuth2 access token at the configured endpoint.
//!
//! ```
//! # use google_cloud_tokenprovider::config::Config;
//! # use google_cloud_tokenprovider::sources::jwt::Builder;
//! let config = Config::from_json(br#"{
//!     "scopes": ["https://www.googleapis.com/auth/cloud-platform"],
//!     "jwt_token_config": {
//!         "email": "sa@my-project.iam.gserviceaccount.com",
//!         "private_key": "",
//!         "uri": "https://oauth2.googleapis.com/token"
//!     }
//! }"#)?;
//! let provider = Builder::new(config).build();
//! assert!(provider.cache_key().starts_with("jwt:"));
//! # Ok::<(), google_cloud_tokenprovider::build_errors::Error>(())
//! ```

use crate::Result;
use crate::cache_key::create_cache_key;
use crate::config::Config;
use crate::constants::JWT_ACCESS_TOKEN_TAG;
use crate::oauth2::jwt::{Config as JwtConfig, TokenSourceFactory, default_factory};
use crate::provider::{CacheableSource, TokenProvider};
use crate::token::Token;
use crate::token_cache::TokenCache;
use std::sync::Arc;

/// Returns a token provider for access tokens, using the default token
/// source factory and a new cache.
pub fn new_jwt_access_token_provider(config: Config) -> TokenProvider {
    Builder::new(config).build()
}

/// A builder for access token providers.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    factory: Option<Arc<dyn TokenSourceFactory>>,
    cache: Option<TokenCache>,
}

impl Builder {
    /// Creates a builder for `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: None,
            cache: None,
        }
    }

    /// Replaces the factory creating the token sources.
    ///
    /// The default factory performs the exchange over HTTP.
    pub fn with_token_source_factory<T>(mut self, factory: T) -> Self
    where
        T: TokenSourceFactory + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Stores tokens in `cache`, possibly shared with other providers.
    pub fn with_cache(mut self, cache: TokenCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the [JwtSource] without a cache in front of it.
    pub fn build_source(self) -> JwtSource {
        JwtSource {
            cache_key: create_cache_key(JWT_ACCESS_TOKEN_TAG, &self.config),
            conf: super::request_config(&self.config),
            factory: self.factory.unwrap_or_else(default_factory),
        }
    }

    /// Returns a [TokenProvider] for access tokens.
    pub fn build(mut self) -> TokenProvider {
        let cache = self.cache.take().unwrap_or_default();
        TokenProvider::with_cache(self.build_source(), cache)
    }
}

/// Fetches OAuth2 access tokens.
#[derive(Debug)]
pub struct JwtSource {
    cache_key: String,
    conf: JwtConfig,
    factory: Arc<dyn TokenSourceFactory>,
}

#[async_trait::async_trait]
impl CacheableSource for JwtSource {
    fn cache_key(&self) -> &str {
        &self.cache_key
    }

    async fn token(&self) -> Result<Token> {
        self.factory.token_source(&self.conf).token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredentialsError;
    use crate::sources::tests::{
        MockTokenSource, MockTokenSourceFactory, factory_returning, test_config, test_token,
    };
    use std::error::Error as _;
    use std::time::Duration;

    type TestResult = anyhow::Result<()>;

    static_assertions::assert_impl_all!(JwtSource: Send, Sync);

    #[test]
    fn cache_key() {
        let source = Builder::new(test_config()).build_source();
        assert_eq!(
            source.cache_key(),
            create_cache_key(JWT_ACCESS_TOKEN_TAG, &test_config())
        );
        assert!(source.cache_key().starts_with("jwt:"), "{source:?}");
        // Stable across calls.
        assert_eq!(source.cache_key(), source.cache_key());
    }

    #[test]
    fn cache_key_matches_provider() {
        let source = Builder::new(test_config()).build_source();
        let provider = new_jwt_access_token_provider(test_config());
        assert_eq!(source.cache_key(), provider.cache_key());
    }

    #[test]
    fn request_config() {
        let source = Builder::new(test_config()).build_source();
        let conf = &source.conf;
        assert_eq!(conf.email, "test-email@example.com");
        assert_eq!(conf.private_key, "test-private-key");
        assert_eq!(conf.token_url, "https://example.com/token");
        assert_eq!(conf.scopes, vec!["scope1", "scope2"]);
        assert_eq!(conf.subject, None);
        assert_eq!(conf.expires, None);
        assert!(conf.private_claims.is_empty(), "{conf:?}");
        assert!(!conf.use_id_token);
    }

    #[tokio::test]
    async fn token_success() -> TestResult {
        let mut source = MockTokenSource::new();
        source
            .expect_token()
            .times(1)
            .return_once(|| Ok(test_token("test-access-token")));
        let mut factory = MockTokenSourceFactory::new();
        factory
            .expect_token_source()
            .withf(|conf| {
                conf.email == "test-email@example.com"
                    && conf.token_url == "https://example.com/token"
                    && !conf.use_id_token
            })
            .times(1)
            .return_once(|_| Box::new(source));

        let source = Builder::new(test_config())
            .with_token_source_factory(factory)
            .build_source();
        let token = source.token().await?;
        assert_eq!(token, test_token("test-access-token"));
        Ok(())
    }

    #[tokio::test]
    async fn token_error_is_unchanged() -> TestResult {
        let cause = std::io::Error::other("stub token source failure");
        let factory = factory_returning(Err(CredentialsError::from_source(true, cause)));

        let source = Builder::new(test_config())
            .with_token_source_factory(factory)
            .build_source();
        let err = source.token().await.unwrap_err();
        assert!(err.is_retryable(), "{err}");
        assert!(
            err.to_string().contains("stub token source failure"),
            "{err}"
        );
        let inner = err
            .source()
            .and_then(|e| e.downcast_ref::<std::io::Error>());
        assert!(inner.is_some(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn non_retryable_error_is_unchanged() -> TestResult {
        let factory = factory_returning(Err(CredentialsError::from_msg(false, "invalid_grant")));
        let source = Builder::new(test_config())
            .with_token_source_factory(factory)
            .build_source();
        let err = source.token().await.unwrap_err();
        assert!(!err.is_retryable(), "{err}");
        assert!(err.to_string().contains("invalid_grant"), "{err}");
        Ok(())
    }

    #[tokio::test]
    async fn provider_caches_token() -> TestResult {
        let factory = factory_returning(Ok(test_token("test-access-token")));
        let provider = Builder::new(test_config())
            .with_token_source_factory(factory)
            .build();
        assert_eq!(provider.token().await?.token, "test-access-token");
        // The factory expects a single call.
        assert_eq!(provider.token().await?.token, "test-access-token");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation() {
        let source = Builder::new(test_config())
            .with_token_source_factory(PendingFactory)
            .build_source();
        let result = tokio::time::timeout(Duration::from_secs(5), source.token()).await;
        assert!(result.is_err(), "the request should be cancelled");
    }

    // Token sources that never complete.
    #[derive(Debug)]
    struct PendingFactory;

    #[derive(Debug)]
    struct PendingSource;

    #[async_trait::async_trait]
    impl crate::oauth2::TokenSource for PendingSource {
        async fn token(&self) -> Result<Token> {
            std::future::pending().await
        }
    }

    impl TokenSourceFactory for PendingFactory {
        fn token_source(&self, _config: &JwtConfig) -> Box<dyn crate::oauth2::TokenSource> {
            Box::new(PendingSource)
        }
    }
}
