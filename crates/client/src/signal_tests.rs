// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use bytes::Bytes;
use proptest::prelude::*;
use reqwest::header::HeaderMap;

use super::*;

fn response(status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        headers: HeaderMap::new(),
        body: Bytes::from(body.to_owned()),
    }
}

#[yare::parameterized(
    expired_envelope = { 401, r#"{"error":{"code":"TOKEN_EXPIRED","message":"expired"}}"#, true },
    expired_flat = { 401, r#"{"code":"TOKEN_EXPIRED"}"#, true },
    other_denial = { 401, r#"{"error":{"code":"UNAUTHORIZED","message":"bad token"}}"#, false },
    no_reason = { 401, "Unauthorized", false },
    forbidden_with_code = { 403, r#"{"error":{"code":"TOKEN_EXPIRED"}}"#, false },
    not_found = { 404, r#"{"error":{"code":"NOT_FOUND"}}"#, false },
    success = { 200, r#"{"code":"TOKEN_EXPIRED"}"#, false },
)]
fn default_signal(status: u16, body: &str, expected: bool) {
    assert_eq!(ExpirySignal::default().matches(&response(status, body)), expected);
}

#[test]
fn custom_code_is_honoured() {
    let signal = ExpirySignal::new("jwt_expired");
    assert_eq!(signal.code(), "jwt_expired");
    assert!(signal.matches(&response(401, r#"{"code":"jwt_expired"}"#)));
    assert!(!signal.matches(&response(401, r#"{"code":"TOKEN_EXPIRED"}"#)));
}

proptest! {
    #[test]
    fn only_unauthorized_can_signal_expiry(status in 100u16..600) {
        prop_assume!(status != 401);
        let body = r#"{"error":{"code":"TOKEN_EXPIRED"}}"#;
        prop_assert!(!ExpirySignal::default().matches(&response(status, body)));
    }
}
