// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::authenticator::RequestAuthenticator;
use crate::credential::Credential;
use crate::error::RequestError;
use crate::request::{ApiResponse, RequestDescriptor};

/// Sends descriptors over the shared HTTP client.
///
/// Reissues go out with the same method, URL, body, and headers as the
/// original call; only the bearer header changes.
#[derive(Debug, Clone)]
pub struct RetryDispatcher {
    http: reqwest::Client,
}

impl RetryDispatcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Send `descriptor` with exactly `headers`, buffering the response.
    pub async fn send(
        &self,
        descriptor: &RequestDescriptor,
        headers: HeaderMap,
    ) -> Result<ApiResponse, RequestError> {
        let mut req = self.http.request(descriptor.method.clone(), &descriptor.url).headers(headers);
        if let Some(ref body) = descriptor.body {
            req = req.body(body.clone());
        }
        let resp = req.send().await.map_err(RequestError::from_transport)?;
        ApiResponse::read(resp).await
    }

    /// Reissue an expired call with a renewed credential.
    ///
    /// The outcome is returned verbatim; an error status here is final.
    pub async fn reissue(
        &self,
        descriptor: &RequestDescriptor,
        credential: &Credential,
    ) -> Result<ApiResponse, RequestError> {
        debug!(method = %descriptor.method, url = %descriptor.url, "reissuing with renewed credential");
        let headers = RequestAuthenticator::with_credential(&descriptor.headers, credential);
        self.send(descriptor, headers).await?.into_result()
    }
}
