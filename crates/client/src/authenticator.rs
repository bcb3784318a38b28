// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::credential::{Credential, CredentialStore};

/// Attaches the current credential to outbound headers.
///
/// Never fails: with no credential the headers go out unchanged, which is the
/// normal state for public endpoints and before sign-in.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    store: CredentialStore,
}

impl RequestAuthenticator {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Headers for a first attempt, carrying whatever credential is current.
    pub fn authorize(&self, headers: &HeaderMap) -> HeaderMap {
        match self.store.read() {
            Some(credential) => Self::with_credential(headers, &credential),
            None => headers.clone(),
        }
    }

    /// Copy of `headers` with the bearer header replaced by `credential`.
    pub fn with_credential(headers: &HeaderMap, credential: &Credential) -> HeaderMap {
        let mut headers = headers.clone();
        match HeaderValue::from_str(&format!("Bearer {}", credential.expose())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("credential is not a valid header value, sending unauthenticated");
                headers.remove(AUTHORIZATION);
            }
        }
        headers
    }
}

#[cfg(test)]
#[path = "authenticator_tests.rs"]
mod tests;
