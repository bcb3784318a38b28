// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use serial_test::serial;

use super::*;

#[derive(Debug, Parser)]
struct Harness {
    #[command(flatten)]
    config: ClientConfig,
}

fn parse(args: &[&str]) -> ClientConfig {
    Harness::parse_from(args).config
}

#[test]
#[serial]
fn defaults_match_new() {
    let parsed = parse(&["authflight"]);
    let built = ClientConfig::new(DEFAULT_BASE_URL);

    assert_eq!(parsed.base_url, built.base_url);
    assert_eq!(parsed.refresh_path, built.refresh_path);
    assert_eq!(parsed.sign_in_path, built.sign_in_path);
    assert_eq!(parsed.sign_out_path, built.sign_out_path);
    assert_eq!(parsed.sign_in_url, built.sign_in_url);
    assert_eq!(parsed.expired_code, "TOKEN_EXPIRED");
    assert_eq!(parsed.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert!(parsed.token.is_none());
}

#[test]
#[serial]
fn flags_override_defaults() -> anyhow::Result<()> {
    let config = parse(&[
        "authflight",
        "--base-url",
        "https://api.example.com/",
        "--token",
        "T1",
        "--refresh-path",
        "/auth/renew",
        "--expired-code",
        "jwt_expired",
        "--timeout-ms",
        "0",
    ]);
    config.validate()?;
    assert_eq!(config.token.as_deref(), Some("T1"));
    assert_eq!(config.refresh_url(), "https://api.example.com/auth/renew");
    assert_eq!(config.expired_code, "jwt_expired");
    assert_eq!(config.timeout(), None);
    Ok(())
}

#[test]
#[serial]
fn env_supplies_values() {
    std::env::set_var("AUTHFLIGHT_BASE_URL", "http://env.example:9000");
    std::env::set_var("AUTHFLIGHT_TOKEN", "from-env");
    let config = parse(&["authflight"]);
    std::env::remove_var("AUTHFLIGHT_BASE_URL");
    std::env::remove_var("AUTHFLIGHT_TOKEN");

    assert_eq!(config.base_url, "http://env.example:9000");
    assert_eq!(config.token.as_deref(), Some("from-env"));
}

#[test]
fn timeout_in_millis() {
    let mut config = ClientConfig::new("http://localhost");
    config.timeout_ms = 250;
    assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
}

#[yare::parameterized(
    not_a_url = { "not a url", "invalid base URL" },
    wrong_scheme = { "ftp://files.example", "http or https" },
)]
fn invalid_base_url(base: &str, expected_substr: &str) {
    crate::assert_err_contains!(ClientConfig::new(base).validate(), expected_substr);
}

#[test]
fn empty_refresh_path_is_rejected() {
    let mut config = ClientConfig::new("http://localhost");
    config.refresh_path = "  ".to_owned();
    crate::assert_err_contains!(config.validate(), "--refresh-path");
}

#[test]
fn session_cookie_needs_a_value() {
    let mut config = ClientConfig::new("http://localhost");
    config.session_cookie = Some("session".to_owned());
    crate::assert_err_contains!(config.validate(), "name=value");
}

#[yare::parameterized(
    plain = { "http://api", "/v1/items", "http://api/v1/items" },
    trailing_base_slash = { "http://api/", "/v1/items", "http://api/v1/items" },
    no_leading_slash = { "http://api", "v1/items", "http://api/v1/items" },
    base_with_prefix = { "http://api/prefix/", "v1", "http://api/prefix/v1" },
    absolute_path = { "http://api", "https://other/renew", "https://other/renew" },
    empty_base = { "", "/v1/items", "/v1/items" },
)]
fn url_joining(base: &str, path: &str, expected: &str) {
    assert_eq!(join_url(base, path), expected);
}
