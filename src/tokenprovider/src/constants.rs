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

use std::time::Duration;

pub(crate) const OAUTH2_TOKEN_SERVER_URL: &str = "https://oauth2.googleapis.com/token";
/// JWT Bearer OAuth Grant Type
pub(crate) const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Provider-type tag for access token sources.
pub(crate) const JWT_ACCESS_TOKEN_TAG: &str = "jwt";
/// Provider-type tag for identity token sources.
pub(crate) const JWT_IDENTITY_TOKEN_TAG: &str = "jwt_identity";

/// The private claim carrying the audience of an ID token.
pub(crate) const TARGET_AUDIENCE_CLAIM: &str = "target_audience";

pub(crate) const DEFAULT_TOKEN_TYPE: &str = "Bearer";
/// Lifetime of the assertion when the configuration does not set one.
pub(crate) const DEFAULT_ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);
/// Assertions are backdated by this much to tolerate clock skew with the
/// token endpoint.
pub(crate) const CLOCK_SKEW_FUDGE: Duration = Duration::from_secs(10);
/// Lifetime requested by identity token sources.
pub(crate) const IDENTITY_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
