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

//! The sources in this module map a [Config] into an [oauth2::jwt::Config]
//! and delegate the token exchange to a [TokenSourceFactory].
//!
//! Neither source validates its input, signs, or sends anything. Errors
//! returned by the token source are surfaced unchanged.
//!
//! [Config]: crate::config::Config
//! [oauth2::jwt::Config]: crate::oauth2::jwt::Config
//! [TokenSourceFactory]: crate::oauth2::jwt::TokenSourceFactory

pub mod jwt;
pub mod jwt_identity;

use crate::config::Config;
use crate::oauth2::jwt::Config as JwtConfig;

// The fields shared by access and identity token requests.
fn request_config(config: &Config) -> JwtConfig {
    JwtConfig {
        email: config.jwt_token_config.email.clone(),
        private_key: config.jwt_token_config.private_key.clone(),
        token_url: config.jwt_token_config.uri.clone(),
        scopes: config.scopes.clone(),
        ..Default::default()
    }
}
