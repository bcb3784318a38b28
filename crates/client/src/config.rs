// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::error::RequestError;
use crate::signal::DEFAULT_EXPIRED_CODE;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub const DEFAULT_SIGN_IN_PATH: &str = "/api/v1/auth/login";
pub const DEFAULT_SIGN_OUT_PATH: &str = "/api/v1/auth/logout";
pub const DEFAULT_SIGN_IN_URL: &str = "/login";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Configuration for an authenticated API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the API; relative request paths are joined onto it.
    #[arg(long, env = "AUTHFLIGHT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Initial bearer credential.
    #[arg(long, env = "AUTHFLIGHT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Ambient session cookie (`name=value`) presented to the renewal endpoint.
    #[arg(long, env = "AUTHFLIGHT_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Renewal endpoint, relative to the base URL or absolute.
    #[arg(long, env = "AUTHFLIGHT_REFRESH_PATH", default_value = DEFAULT_REFRESH_PATH)]
    pub refresh_path: String,

    /// Sign-in endpoint that issues a credential.
    #[arg(long, env = "AUTHFLIGHT_SIGN_IN_PATH", default_value = DEFAULT_SIGN_IN_PATH)]
    pub sign_in_path: String,

    /// Sign-out endpoint that invalidates the server-side session.
    #[arg(long, env = "AUTHFLIGHT_SIGN_OUT_PATH", default_value = DEFAULT_SIGN_OUT_PATH)]
    pub sign_out_path: String,

    /// Re-authentication entry point the user is sent to when the session ends.
    #[arg(long, env = "AUTHFLIGHT_SIGN_IN_URL", default_value = DEFAULT_SIGN_IN_URL)]
    pub sign_in_url: String,

    /// Reason code that marks a 401 as an expired credential.
    #[arg(long, env = "AUTHFLIGHT_EXPIRED_CODE", default_value = DEFAULT_EXPIRED_CODE)]
    pub expired_code: String,

    /// Per-request timeout in milliseconds (0 = no timeout).
    #[arg(long, env = "AUTHFLIGHT_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

impl ClientConfig {
    /// Defaults for `base_url`, without reading argv or the environment.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            session_cookie: None,
            refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_owned(),
            sign_out_path: DEFAULT_SIGN_OUT_PATH.to_owned(),
            sign_in_url: DEFAULT_SIGN_IN_URL.to_owned(),
            expired_code: DEFAULT_EXPIRED_CODE.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        let base = reqwest::Url::parse(self.base_url.trim())
            .map_err(|e| RequestError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RequestError::Config(format!(
                "base URL must be http or https, got {}",
                base.scheme()
            )));
        }
        for (flag, value) in [
            ("--refresh-path", &self.refresh_path),
            ("--sign-in-path", &self.sign_in_path),
            ("--sign-out-path", &self.sign_out_path),
            ("--expired-code", &self.expired_code),
        ] {
            if value.trim().is_empty() {
                return Err(RequestError::Config(format!("{flag} must not be empty")));
            }
        }
        if let Some(ref cookie) = self.session_cookie {
            if !cookie.contains('=') {
                return Err(RequestError::Config("--session-cookie must be name=value".to_owned()));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Resolve `path` against the base URL; absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        path.to_owned()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
