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

//! Identity token provider for service account JWT configurations.
//!
//! [ID tokens] are used for service to service authentication, for example
//! to call a Cloud Run service. The provider requests a token whose audience
//! is the configured `target_audience`, on behalf of the service account
//! itself.
//!
//! [ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens

use crate::Result;
use crate::cache_key::create_cache_key;
use crate::config::Config;
use crate::constants::{IDENTITY_TOKEN_LIFETIME, JWT_IDENTITY_TOKEN_TAG, TARGET_AUDIENCE_CLAIM};
use crate::oauth2::jwt::{Config as JwtConfig, TokenSourceFactory, default_factory};
use crate::provider::{CacheableSource, TokenProvider};
use crate::token::Token;
use crate::token_cache::TokenCache;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Returns a token provider for identity tokens, using the default token
/// source factory and a new cache.
pub fn new_jwt_identity_token_provider(config: Config) -> TokenProvider {
    Builder::new(config).build()
}

/// A builder for identity token providers.
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

    /// Returns the [JwtIdentitySource] without a cache in front of it.
    pub fn build_source(self) -> JwtIdentitySource {
        let jwt = &self.config.jwt_token_config;
        // A missing audience is still sent, as `null`.
        let target_audience = jwt
            .target_audience
            .clone()
            .map_or(Value::Null, Value::String);
        let conf = JwtConfig {
            subject: Some(jwt.email.clone()),
            expires: Some(IDENTITY_TOKEN_LIFETIME),
            private_claims: Map::from_iter([(TARGET_AUDIENCE_CLAIM.to_string(), target_audience)]),
            use_id_token: true,
            ..super::request_config(&self.config)
        };
        JwtIdentitySource {
            cache_key: create_cache_key(JWT_IDENTITY_TOKEN_TAG, &self.config),
            conf,
            factory: self.factory.unwrap_or_else(default_factory),
        }
    }

    /// Returns a [TokenProvider] for identity tokens.
    pub fn build(mut self) -> TokenProvider {
        let cache = self.cache.take().unwrap_or_default();
        TokenProvider::with_cache(self.build_source(), cache)
    }
}

/// Fetches Google-signed ID tokens.
#[derive(Debug)]
pub struct JwtIdentitySource {
    cache_key: String,
    conf: JwtConfig,
    factory: Arc<dyn TokenSourceFactory>,
}

#[async_trait::async_trait]
impl CacheableSource for JwtIdentitySource {
    fn cache_key(&self) -> &str {
        &self.cache_key
    }

    async fn token(&self) -> Result<Token> {
        self.factory.token_source(&self.conf).token().await
    }
}
