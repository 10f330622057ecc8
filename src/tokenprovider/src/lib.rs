// Copyright 2024 Google LLC
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

//! Google Cloud Client Libraries for Rust - JWT Token Providers
//!
//! This crate contains token providers that turn a service account [JWT]
//! configuration (an email, a private key, a token endpoint, a set of scopes
//! and an optional target audience) into [Tokens].
//!
//! Two flavors are available:
//!
//! * [sources::jwt] obtains OAuth2 access tokens, used to authorize calls to
//!   Google Cloud APIs.
//! * [sources::jwt_identity] obtains OIDC [ID tokens], used for service to
//!   service authentication.
//!
//! Both flavors return a [provider::TokenProvider]. Each provider exposes a
//! deterministic cache key, derived from its configuration, and reuses tokens
//! while they remain valid. Providers sharing a [token_cache::TokenCache] and
//! a cache key share their tokens.
//!
//! ```no_run
//! # use google_cloud_tokenprovider::config::Config;
//! # use google_cloud_tokenprovider::sources::jwt;
//! # tokio_test::block_on(async {
//! let config = Config::from_file("service-account.json").await?;
//! let provider = jwt::new_jwt_access_token_provider(config);
//! let token = provider.token().await?;
//! println!("cache key: {}, type: {}", provider.cache_key(), token.token_type);
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```
//!
//! [ID tokens]: https://cloud.google.com/docs/authentication/token-types#identity-tokens
//! [JWT]: https://google.aip.dev/auth/4111
//! [Tokens]: https://cloud.google.com/docs/authentication#token

pub mod build_errors;
pub mod errors;

/// Configuration for the JWT token providers.
pub mod config;

pub mod token;

/// The token cache shared by providers.
pub mod token_cache;

/// The provider wrapper consumed by applications.
pub mod provider;

pub mod sources;

pub mod oauth2;

pub(crate) mod cache_key;
pub(crate) mod constants;

/// A `Result` alias where the `Err` case is
/// `google_cloud_tokenprovider::errors::CredentialsError`.
pub(crate) type Result<T> = std::result::Result<T, crate::errors::CredentialsError>;

/// A `Result` alias where the `Err` case is
/// `google_cloud_tokenprovider::build_errors::Error`.
pub(crate) type BuildResult<T> = std::result::Result<T, crate::build_errors::Error>;
