// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::StatusCode;

use crate::error::parse_error_body;
use crate::request::ApiResponse;

/// Default reason code the API uses for an expired credential.
pub const DEFAULT_EXPIRED_CODE: &str = "TOKEN_EXPIRED";

/// Recognizes the "credential expired" response shape: 401 plus a reason code
/// that distinguishes expiry from any other authorization denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirySignal {
    code: String,
}

impl ExpirySignal {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn matches(&self, response: &ApiResponse) -> bool {
        response.status == StatusCode::UNAUTHORIZED
            && parse_error_body(&response.body).is_some_and(|body| body.code == self.code)
    }
}

impl Default for ExpirySignal {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRED_CODE)
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
