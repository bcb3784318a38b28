// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end renewal scenarios against the stub identity API.

use futures_util::future::join_all;
use serde_json::{json, Value};

use authflight::test_support::{closed_port_url, RenewalMode};
use authflight::{AuthEvent, Credential, RequestError};
use authflight_specs::{Session, INITIAL_TOKEN};

// -- Fan-out success ----------------------------------------------------------

#[tokio::test]
async fn three_expired_calls_share_one_renewal() -> anyhow::Result<()> {
    let mut session = Session::start().await?;
    session.stub.close_gate();

    let client = &session.client;
    let payloads = [json!({"call": "a"}), json!({"call": "b"}), json!({"call": "c"})];
    let calls = join_all(payloads.iter().map(|p| client.post_json::<_, Value>("/api/v1/echo", p)));
    let release = async {
        let queued = session.wait_queued(2).await;
        session.stub.open_gate();
        queued
    };
    let (results, queued) = tokio::join!(calls, release);
    queued?;

    let mut bodies = Vec::new();
    for result in results {
        let body = result?;
        assert_eq!(body["token"], "renewed-1");
        bodies.push(body["body"].as_str().unwrap_or_default().to_owned());
    }
    bodies.sort();
    assert_eq!(bodies, [r#"{"call":"a"}"#, r#"{"call":"b"}"#, r#"{"call":"c"}"#]);

    assert_eq!(session.stub.renewals(), 1);
    assert_eq!(session.client.credentials().read(), Some(Credential::new("renewed-1")));
    assert_eq!(session.client.coordinator().pending_len(), 0);
    assert!(!session.client.coordinator().is_refreshing());
    assert_eq!(session.navigator.count(), 0);

    let retried: Vec<_> = session
        .stub
        .hits_on("/api/v1/echo")
        .into_iter()
        .filter(|h| h.token.as_deref() == Some("renewed-1"))
        .collect();
    assert_eq!(retried.len(), 3);

    assert_eq!(session.drain_events(), vec![AuthEvent::Refreshed { waiters: 2 }]);
    Ok(())
}

#[tokio::test]
async fn many_concurrent_expiries_renew_once() -> anyhow::Result<()> {
    const CALLERS: usize = 16;
    let session = Session::start().await?;
    session.stub.close_gate();

    let client = &session.client;
    let calls = join_all((0..CALLERS).map(|_| client.get_json::<Value>("/api/v1/echo")));
    let release = async {
        let queued = session.wait_queued(CALLERS - 1).await;
        session.stub.open_gate();
        queued
    };
    let (results, queued) = tokio::join!(calls, release);
    queued?;

    for result in results {
        assert_eq!(result?["token"], "renewed-1");
    }
    assert_eq!(session.stub.renewals(), 1);
    Ok(())
}

// -- Fan-out failure ----------------------------------------------------------

#[tokio::test]
async fn rejected_renewal_fails_every_caller_and_signs_out_once() -> anyhow::Result<()> {
    let mut session = Session::start().await?;
    session.stub.set_renewal_mode(RenewalMode::Reject(401));
    session.stub.close_gate();

    let client = &session.client;
    let calls = join_all((0..3).map(|_| client.get_json::<Value>("/api/v1/echo")));
    let release = async {
        let queued = session.wait_queued(2).await;
        session.stub.open_gate();
        queued
    };
    let (results, queued) = tokio::join!(calls, release);
    queued?;

    for result in results {
        let err = result.err();
        assert_eq!(err.as_ref().and_then(RequestError::status), Some(401));
        assert_eq!(err.as_ref().and_then(RequestError::code), Some("SESSION_EXPIRED"));
    }
    assert_eq!(session.stub.renewals(), 1);
    assert!(session.client.credentials().read().is_none());
    assert_eq!(session.navigator.count(), 1);
    assert_eq!(session.stub.hits_on("/api/v1/echo").len(), 3);

    let events = session.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], AuthEvent::RefreshFailed { .. }));
    assert!(matches!(events[1], AuthEvent::SessionEnded { .. }));
    Ok(())
}

#[tokio::test]
async fn unreachable_renewal_rejects_with_network_error() -> anyhow::Result<()> {
    let refresh = format!("{}/api/v1/auth/refresh", closed_port_url()?);
    let session = Session::build()
        .config(move |_, config| config.refresh_path = refresh)
        .start()
        .await?;

    let err = session.client.get_json::<Value>("/api/v1/echo").await.err();

    assert!(matches!(err, Some(RequestError::Network(_))), "unexpected outcome: {err:?}");
    assert!(session.client.credentials().read().is_none());
    assert_eq!(session.navigator.count(), 1);
    assert!(!session.client.coordinator().is_refreshing());
    Ok(())
}

// -- Bounded recovery ---------------------------------------------------------

#[tokio::test]
async fn expiry_after_reissue_is_final() -> anyhow::Result<()> {
    let session = Session::start().await?;

    let err = session.client.get_json::<Value>("/api/v1/always-expired").await.err();

    assert_eq!(err.as_ref().and_then(RequestError::code), Some("TOKEN_EXPIRED"));
    assert_eq!(session.stub.renewals(), 1);
    assert_eq!(session.navigator.count(), 0);
    Ok(())
}

#[tokio::test]
async fn non_expiry_errors_never_renew() -> anyhow::Result<()> {
    let session = Session::start().await?;
    session.stub.accept_token(INITIAL_TOKEN);

    let missing = session.client.get_json::<Value>("/api/v1/missing").await.err();
    let invalid = session.client.post_json::<_, Value>("/api/v1/validate", &json!({})).await.err();

    assert_eq!(missing.as_ref().and_then(RequestError::status), Some(404));
    assert_eq!(invalid.as_ref().and_then(RequestError::status), Some(422));
    assert_eq!(session.stub.renewals(), 0);
    assert_eq!(session.client.credentials().read(), Some(Credential::new(INITIAL_TOKEN)));
    Ok(())
}

// -- Session lifecycle --------------------------------------------------------

#[tokio::test]
async fn sign_in_after_session_end_recovers() -> anyhow::Result<()> {
    let session = Session::build()
        .config(|_, config| config.session_cookie = None)
        .start()
        .await?;

    // No session cookie yet: renewal fails and the session ends.
    assert!(session.client.get_json::<Value>("/api/v1/echo").await.is_err());
    assert_eq!(session.navigator.count(), 1);

    session.client.sign_in(&json!({"user": "ada"})).await?;
    session.stub.expire_all();
    let body: Value = session.client.get_json("/api/v1/echo").await?;

    assert_eq!(body["token"], "renewed-2");
    assert_eq!(session.stub.renewals(), 2);
    Ok(())
}
