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
use crate::errors::{self, CredentialsError};
use rustls::SignatureScheme;
use rustls::crypto::CryptoProvider;
use rustls::sign::Signer;
use rustls_pemfile::Item;

// Creates an RS256 signer from a PEM-encoded private key.
pub(crate) fn signer(private_key: &str) -> Result<Box<dyn Signer>> {
    let key_provider = CryptoProvider::get_default().map_or_else(
        || rustls::crypto::ring::default_provider().key_provider,
        |p| p.key_provider,
    );

    let item = rustls_pemfile::read_one(&mut private_key.as_bytes())
        .map_err(errors::non_retryable)?
        .ok_or_else(|| errors::non_retryable_from_str("missing PEM section in private key"))?;
    let pk = match item {
        Item::Pkcs8Key(item) => key_provider.load_private_key(item.into()),
        Item::Pkcs1Key(item) => key_provider.load_private_key(item.into()),
        other => return Err(unexpected_private_key_error(other)),
    };
    let sk = pk.map_err(errors::non_retryable)?;

    sk.choose_scheme(&[SignatureScheme::RSA_PKCS1_SHA256])
        .ok_or_else(|| {
            errors::non_retryable_from_str(
                "unable to choose RSA_PKCS1_SHA256 signing scheme as it is not supported by current signer",
            )
        })
}

fn unexpected_private_key_error(private_key_format: Item) -> CredentialsError {
    errors::non_retryable_from_str(format!(
        "expected key to be in form of PKCS8 or PKCS1, found {private_key_format:?}"
    ))
}
