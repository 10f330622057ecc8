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

//! The two-legged OAuth2 flow, sometimes called "service account" or
//! "JWT bearer" flow.
//!
//! A [Config] describes the assertion to sign and the endpoint that
//! exchanges it. A [TokenSourceFactory] turns a `Config` into a
//! [TokenSource]. Token providers receive the factory at construction time,
//! which lets tests replace the network exchange with a stub.

use super::jws::{JwsClaims, JwsHeader};
use super::{TokenResponse, TokenSource, id_token_expiry, signer};
use crate::Result;
use crate::constants::{
    CLOCK_SKEW_FUDGE, DEFAULT_ASSERTION_LIFETIME, DEFAULT_TOKEN_TYPE, JWT_BEARER_GRANT_TYPE,
};
use crate::errors::{self, CredentialsError, is_retryable};
use crate::token::Token;
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::Instant;

/// The settings of a JWT bearer token exchange.
#[derive(Clone, Default, PartialEq)]
pub struct Config {
    /// The OAuth client identifier, the service account email. It becomes
    /// the `iss` claim.
    pub email: String,

    /// The PEM-encoded private key, in PKCS#8 or PKCS#1 format.
    pub private_key: String,

    /// The key identifier, sent as the `kid` header when set.
    pub private_key_id: Option<String>,

    /// The user to impersonate, sent as the `sub` claim when set.
    pub subject: Option<String>,

    /// The requested permissions, joined with spaces into the `scope` claim.
    pub scopes: Vec<String>,

    /// The endpoint that exchanges the assertion.
    pub token_url: String,

    /// The lifetime of the assertion. Defaults to one hour.
    pub expires: Option<Duration>,

    /// The `aud` claim. Defaults to `token_url`.
    pub audience: Option<String>,

    /// Extra claims merged into the claim set.
    pub private_claims: Map<String, Value>,

    /// Requests an ID token instead of an access token.
    ///
    /// The returned [Token] carries the ID token, and its expiration comes
    /// from the ID token `exp` claim.
    pub use_id_token: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("email", &self.email)
            .field("private_key", &"[censored]")
            .field("private_key_id", &self.private_key_id)
            .field("subject", &self.subject)
            .field("scopes", &self.scopes)
            .field("token_url", &self.token_url)
            .field("expires", &self.expires)
            .field("audience", &self.audience)
            .field("private_claims", &self.private_claims)
            .field("use_id_token", &self.use_id_token)
            .finish()
    }
}

/// Creates [TokenSource]s for a [Config].
pub trait TokenSourceFactory: std::fmt::Debug + Send + Sync {
    /// Returns a token source fetching tokens as described by `config`.
    fn token_source(&self, config: &Config) -> Box<dyn TokenSource>;
}

/// The default [TokenSourceFactory], creating [JwtTokenSource]s.
///
/// All the token sources created by one factory share its HTTP client.
#[derive(Clone, Debug, Default)]
pub struct DefaultTokenSourceFactory {
    client: reqwest::Client,
}

impl DefaultTokenSourceFactory {
    /// Creates a factory with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory using `client` for all token exchanges.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl TokenSourceFactory for DefaultTokenSourceFactory {
    fn token_source(&self, config: &Config) -> Box<dyn TokenSource> {
        Box::new(JwtTokenSource::new(config.clone(), self.client.clone()))
    }
}

pub(crate) fn default_factory() -> Arc<dyn TokenSourceFactory> {
    Arc::new(DefaultTokenSourceFactory::new())
}

/// Fetches tokens by exchanging signed JWT assertions.
#[derive(Debug)]
pub struct JwtTokenSource {
    config: Config,
    client: reqwest::Client,
}

impl JwtTokenSource {
    /// Creates a token source for `config`.
    pub fn new(config: Config, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    // Builds and signs the assertion.
    fn assertion(&self) -> Result<String> {
        let signer = signer::signer(&self.config.private_key)?;

        let now = OffsetDateTime::now_utc();
        let iat = now - CLOCK_SKEW_FUDGE;
        let exp = now + self.config.expires.unwrap_or(DEFAULT_ASSERTION_LIFETIME);
        let scope = (!self.config.scopes.is_empty()).then(|| self.config.scopes.join(" "));
        let claims = JwsClaims {
            iss: &self.config.email,
            scope,
            aud: self
                .config
                .audience
                .as_deref()
                .unwrap_or(&self.config.token_url),
            exp,
            iat,
            sub: self.config.subject.as_deref(),
            prn: self.config.subject.as_deref(),
            private_claims: &self.config.private_claims,
        };
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.config.private_key_id.as_deref(),
        };

        let encoded_header_claims = format!("{}.{}", header.encode()?, claims.encode()?);
        let sig = signer
            .sign(encoded_header_claims.as_bytes())
            .map_err(errors::non_retryable)?;
        Ok(format!(
            "{encoded_header_claims}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    fn token_from_response(&self, response: TokenResponse) -> Result<Token> {
        let token_type = response
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        let mut token = Token {
            token: response.access_token,
            token_type,
            expires_at: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
            metadata: None,
        };

        match response.id_token.filter(|t| !t.is_empty()) {
            Some(id_token) => {
                if let Some(expires_at) = id_token_expiry(&id_token)? {
                    token.expires_at = Some(expires_at);
                }
                token.metadata = Some(HashMap::from([(
                    "id_token".to_string(),
                    id_token.clone(),
                )]));
                if self.config.use_id_token {
                    token.token = id_token;
                }
            }
            None if self.config.use_id_token => {
                return Err(errors::non_retryable_from_str(
                    "the token endpoint response does not have an ID token",
                ));
            }
            None => {}
        }
        Ok(token)
    }
}

#[async_trait::async_trait]
impl TokenSource for JwtTokenSource {
    async fn token(&self) -> Result<Token> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(errors::retryable)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| CredentialsError::from_source(is_retryable(status), e))?;
            return Err(CredentialsError::from_msg(
                is_retryable(status),
                format!(
                    "cannot fetch token from {}: {status}, response: {body}",
                    self.config.token_url
                ),
            ));
        }

        let response = response.json::<TokenResponse>().await.map_err(|e| {
            let retryable = !e.is_decode();
            CredentialsError::from_source(retryable, e)
        })?;
        self.token_from_response(response)
    }
}
