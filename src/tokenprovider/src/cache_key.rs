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

use crate::config::Config;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize)]
struct CacheKeyFields<'a> {
    provider: &'a str,
    email: &'a str,
    private_key: &'a str,
    uri: &'a str,
    scopes: &'a [String],
    target_audience: Option<&'a str>,
}

/// Returns `<tag>:<hex(sha256(fields))>`.
///
/// The fields are serialized as JSON, in declaration order, so every field
/// boundary is unambiguous. Hashing keeps the private key out of the key.
pub(crate) fn create_cache_key(tag: &str, config: &Config) -> String {
    let jwt = &config.jwt_token_config;
    let fields = CacheKeyFields {
        provider: tag,
        email: &jwt.email,
        private_key: &jwt.private_key,
        uri: &jwt.uri,
        scopes: &config.scopes,
        target_audience: jwt.target_audience.as_deref(),
    };
    // Serializing strings, slices and options into a `Vec` cannot fail.
    let json = serde_json::to_vec(&fields).unwrap_or_default();
    let digest = Sha256::digest(&json);
    format!("{tag}:{}", hex::encode(digest))
}
