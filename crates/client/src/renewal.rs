// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The renewal exchange: trade the ambient session cookie for a fresh credential.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credential::Credential;
use crate::error::RequestError;
use crate::request::ApiResponse;

/// Credential-bearing response from the renewal and sign-in endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "access_token", alias = "accessToken")]
    pub token: String,
}

impl TokenResponse {
    /// Decode a successful response into a credential, rejecting blank tokens.
    pub fn credential_from(response: &ApiResponse) -> Result<Credential, RequestError> {
        let parsed: TokenResponse = response.json()?;
        let token = parsed.token.trim();
        if token.is_empty() {
            return Err(RequestError::Decode("server returned an empty credential".to_owned()));
        }
        Ok(Credential::new(token))
    }
}

/// POSTs to the renewal endpoint without the (expired) bearer header.
///
/// Identity comes from the cookie jar of the shared client.
#[derive(Debug, Clone)]
pub struct RenewalExchange {
    http: reqwest::Client,
    url: String,
}

impl RenewalExchange {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn renew(&self) -> Result<Credential, RequestError> {
        debug!(url = %self.url, "requesting credential renewal");
        let resp = self.http.post(&self.url).send().await.map_err(RequestError::from_transport)?;
        let response = ApiResponse::read(resp).await?.into_result()?;
        TokenResponse::credential_from(&response)
    }
}

#[cfg(test)]
#[path = "renewal_tests.rs"]
mod tests;
