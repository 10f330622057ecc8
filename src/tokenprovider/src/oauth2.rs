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

//! The token sources in this module sign a [JWT bearer] assertion with a
//! service account private key, exchange it at a token endpoint, and parse
//! the response into a [Token].
//!
//! The providers in [crate::sources] never sign or send anything themselves.
//! They describe the request with a [jwt::Config] and hand it to a
//! [jwt::TokenSourceFactory].
//!
//! [JWT bearer]: https://datatracker.ietf.org/doc/html/rfc7523

pub mod jwt;

mod jws;
mod signer;

use crate::Result;
use crate::errors;
use crate::token::Token;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// A source of [Token]s.
///
/// Each call to `token()` fetches a new token. Implementations do not cache
/// nor retry, that is the job of the caller.
#[async_trait::async_trait]
pub trait TokenSource: std::fmt::Debug + Send + Sync {
    /// Fetches a token.
    ///
    /// Dropping the returned future cancels the request.
    async fn token(&self) -> Result<Token>;
}

/// The response of a JWT bearer token exchange.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id_token: Option<String>,
}

#[derive(serde::Deserialize)]
struct IdTokenClaims {
    exp: Option<u64>,
}

/// Returns the expiration encoded in the `exp` claim of a JWT.
///
/// The signature is not verified. Returns `None` if the token has no `exp`
/// claim.
pub(crate) fn id_token_expiry(token: &str) -> Result<Option<Instant>> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(errors::non_retryable_from_str("invalid JWT in id_token")),
    };
    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(errors::non_retryable)?;
    let claims =
        serde_json::from_slice::<IdTokenClaims>(&payload).map_err(errors::non_retryable)?;
    Ok(claims.exp.map(instant_from_epoch_seconds))
}

fn instant_from_epoch_seconds(secs: u64) -> Instant {
    let now = Instant::now();
    let Ok(since_epoch) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return now;
    };
    let target = Duration::from_secs(secs);
    if target >= since_epoch {
        now + (target - since_epoch)
    } else {
        now.checked_sub(since_epoch - target).unwrap_or(now)
    }
}
