// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of error body characters surfaced to callers.
pub const MAX_ERROR_CHARS: usize = 200;

/// Failure of an outbound call, as seen by the caller.
///
/// `Clone` so one renewal failure can be delivered verbatim to every caller
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The server answered with a non-success status.
    Http { status: u16, code: Option<String>, message: String },
    /// The server could not be reached.
    Network(String),
    /// The request exceeded the configured timeout.
    Timeout(String),
    /// The request could not be assembled (bad URL, header, or body).
    Build(String),
    /// The response body did not have the expected shape.
    Decode(String),
    /// The client configuration is unusable.
    Config(String),
    /// The renewal this caller was waiting on went away without an outcome.
    RefreshAbandoned,
}

impl RequestError {
    /// HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine-readable reason code supplied by the server, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http { .. } => "HTTP",
            Self::Network(_) => "NETWORK",
            Self::Timeout(_) => "TIMEOUT",
            Self::Build(_) => "BUILD",
            Self::Decode(_) => "DECODE",
            Self::Config(_) => "CONFIG",
            Self::RefreshAbandoned => "REFRESH_ABANDONED",
        }
    }

    /// Map a transport error, keeping timeouts distinct from other failures.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("request timed out: {err}"))
        } else if err.is_builder() {
            Self::Build(format!("failed to build request: {err}"))
        } else if err.is_decode() {
            Self::Decode(format!("failed to read response: {err}"))
        } else {
            Self::Network(format!("unable to reach the server: {err}"))
        }
    }

    /// Build an `Http` error from a status and raw body.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        match parse_error_body(body) {
            Some(ErrorBody { code, message }) => {
                let message = if message.trim().is_empty() { code.clone() } else { message };
                Self::Http { status, code: Some(code), message: sanitize_body(&message) }
            }
            None => Self::Http {
                status,
                code: None,
                message: sanitize_body(&String::from_utf8_lossy(body)),
            },
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, code: Some(code), message } => {
                write!(f, "HTTP {status} ({code}): {message}")
            }
            Self::Http { status, code: None, message } => write!(f, "HTTP {status}: {message}"),
            Self::Network(msg)
            | Self::Timeout(msg)
            | Self::Build(msg)
            | Self::Decode(msg)
            | Self::Config(msg) => f.write_str(msg),
            Self::RefreshAbandoned => f.write_str("credential renewal ended without an outcome"),
        }
    }
}

impl std::error::Error for RequestError {}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorShape {
    Enveloped(ErrorResponse),
    Flat(ErrorBody),
}

/// Extract the error code and message from either `{"error": {...}}` or a
/// flat `{"code": ..., "message": ...}` body.
pub fn parse_error_body(body: &[u8]) -> Option<ErrorBody> {
    match serde_json::from_slice::<ErrorShape>(body).ok()? {
        ErrorShape::Enveloped(envelope) => Some(envelope.error),
        ErrorShape::Flat(body) => Some(body),
    }
}

/// Trim and truncate an error body for display.
pub fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_owned()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
