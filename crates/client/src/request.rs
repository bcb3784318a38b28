// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound request descriptors and buffered responses.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::RequestError;

/// Everything needed to send a call again: method, URL, headers, body, plus a
/// one-shot marker recording that the call was already retried after expiry.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: HeaderMap::new(), body: None, retried: false }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from raw strings, rejecting invalid names or values.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, RequestError> {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| RequestError::Build(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| RequestError::Build(format!("invalid value for header {name}: {e}")))?;
        Ok(self.header(name, value))
    }

    /// Parse a `name: value` pair as accepted on the command line.
    pub fn try_header_line(self, line: &str) -> Result<Self, RequestError> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RequestError::Build(format!("header must be name:value, got {line:?}")))?;
        self.try_header(name, value)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON and set the content type.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, RequestError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| RequestError::Build(format!("failed to encode request: {e}")))?;
        Ok(self.header(CONTENT_TYPE, HeaderValue::from_static("application/json")).body(payload))
    }

    /// Whether this call already went through one expiry retry.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    /// Drain a live `reqwest` response into memory.
    pub async fn read(response: reqwest::Response) -> Result<Self, RequestError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(RequestError::from_transport)?;
        Ok(Self { status, headers, body })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `Ok(self)` for 2xx, otherwise the mapped `Http` error.
    pub fn into_result(self) -> Result<Self, RequestError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }

    pub fn to_error(&self) -> RequestError {
        RequestError::from_status(self.status.as_u16(), &self.body)
    }

    /// Decode the body as JSON; an empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        let body: &[u8] = if self.body.trim_ascii().is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(body)
            .map_err(|e| RequestError::Decode(format!("failed to decode response: {e}")))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
