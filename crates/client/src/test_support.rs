// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a stub identity API, a recording navigator, and
//! polling helpers.
//!
//! The stub listens on an ephemeral port and behaves like a token-protected
//! API whose credentials can be expired on demand:
//!
//! - `ANY  /api/v1/echo` echoes method, body, and bearer token; 401
//!   `TOKEN_EXPIRED` for any token other than the current one, 401
//!   `UNAUTHORIZED` without a token.
//! - `GET  /api/v1/always-expired` always answers 401 `TOKEN_EXPIRED`.
//! - `GET  /api/v1/denied` answers 401 `UNAUTHORIZED`.
//! - `GET  /api/v1/missing` answers 404 `NOT_FOUND`.
//! - `POST /api/v1/validate` answers 422 `VALIDATION_FAILED`.
//! - `POST /api/v1/auth/refresh` issues `renewed-<n>` when the session cookie
//!   is present, optionally held closed by a gate or forced to fail.
//! - `POST /api/v1/auth/login` issues `signed-in` and sets the session cookie.
//! - `POST /api/v1/auth/logout` answers 204.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::error::{ErrorBody, ErrorResponse};
use crate::terminator::Navigator;

/// Name of the ambient session cookie the stub expects on renewal.
pub const SESSION_COOKIE: &str = "session";

/// Value of the session cookie the stub hands out and accepts.
pub const SESSION_VALUE: &str = "stub-session";

/// Token issued by the stub's sign-in endpoint.
pub const SIGNED_IN_TOKEN: &str = "signed-in";

/// One request observed by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub token: Option<String>,
    pub body: String,
}

/// How the renewal endpoint answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalMode {
    Issue,
    Reject(u16),
}

struct StubState {
    valid: Mutex<Option<String>>,
    mode: Mutex<RenewalMode>,
    renewals: AtomicU32,
    gate: watch::Sender<bool>,
    hits: Mutex<Vec<Hit>>,
    refresh_cookies: Mutex<Vec<Option<String>>>,
    refresh_bearers: Mutex<Vec<Option<String>>>,
}

/// A running stub identity API, shut down on drop.
pub struct StubApi {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubApi {
    pub async fn start() -> anyhow::Result<Self> {
        let (gate, _) = watch::channel(true);
        let state = Arc::new(StubState {
            valid: Mutex::new(None),
            mode: Mutex::new(RenewalMode::Issue),
            renewals: AtomicU32::new(0),
            gate,
            hits: Mutex::new(Vec::new()),
            refresh_cookies: Mutex::new(Vec::new()),
            refresh_bearers: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/api/v1/echo", any(echo))
            .route("/api/v1/always-expired", get(always_expired))
            .route("/api/v1/denied", get(denied))
            .route("/api/v1/missing", get(missing))
            .route("/api/v1/validate", post(validate))
            .route("/api/v1/auth/refresh", post(refresh))
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/logout", post(logout))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { addr, state, task })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Cookie line to seed the client's jar with a valid session.
    pub fn session_cookie(&self) -> String {
        format!("{SESSION_COOKIE}={SESSION_VALUE}")
    }

    /// Make `token` the only credential the stub accepts.
    pub fn accept_token(&self, token: &str) {
        *self.state.valid.lock() = Some(token.to_owned());
    }

    /// Reject every credential as expired.
    pub fn expire_all(&self) {
        *self.state.valid.lock() = None;
    }

    pub fn set_renewal_mode(&self, mode: RenewalMode) {
        *self.state.mode.lock() = mode;
    }

    /// Hold renewal requests open until [`StubApi::open_gate`].
    pub fn close_gate(&self) {
        self.state.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.state.gate.send_replace(true);
    }

    /// Number of renewal requests answered so far.
    pub fn renewals(&self) -> u32 {
        self.state.renewals.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().clone()
    }

    /// Hits on `path`, in arrival order.
    pub fn hits_on(&self, path: &str) -> Vec<Hit> {
        self.state.hits.lock().iter().filter(|h| h.path == path).cloned().collect()
    }

    /// `Cookie` header seen on each renewal request.
    pub fn refresh_cookies(&self) -> Vec<Option<String>> {
        self.state.refresh_cookies.lock().clone()
    }

    /// Bearer token seen on each renewal request.
    pub fn refresh_bearers(&self) -> Vec<Option<String>> {
        self.state.refresh_bearers.lock().clone()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorBody { code: code.to_owned(), message: message.to_owned() },
    };
    (status, Json(body)).into_response()
}

fn record(state: &StubState, method: &Method, path: &str, headers: &HeaderMap, body: &[u8]) {
    state.hits.lock().push(Hit {
        method: method.to_string(),
        path: path.to_owned(),
        token: bearer(headers),
        body: String::from_utf8_lossy(body).into_owned(),
    });
}

async fn echo(
    State(state): State<Arc<StubState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, "/api/v1/echo", &headers, &body);
    let Some(token) = bearer(&headers) else {
        return error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing credential");
    };
    if state.valid.lock().as_deref() != Some(token.as_str()) {
        return error(StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", "access token expired");
    }
    let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok()).map(str::to_owned);
    Json(json!({
        "method": method.to_string(),
        "token": token,
        "body": String::from_utf8_lossy(&body),
        "request_id": request_id,
    }))
    .into_response()
}

async fn always_expired(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    record(&state, &Method::GET, "/api/v1/always-expired", &headers, &[]);
    error(StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", "access token expired")
}

async fn denied(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    record(&state, &Method::GET, "/api/v1/denied", &headers, &[]);
    error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "not allowed")
}

async fn missing(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    record(&state, &Method::GET, "/api/v1/missing", &headers, &[]);
    error(StatusCode::NOT_FOUND, "NOT_FOUND", "no such item")
}

async fn validate(State(state): State<Arc<StubState>>, headers: HeaderMap, body: Bytes) -> Response {
    record(&state, &Method::POST, "/api/v1/validate", &headers, &body);
    error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED", "name is required")
}

async fn refresh(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state
        .refresh_cookies
        .lock()
        .push(headers.get("cookie").and_then(|v| v.to_str().ok()).map(str::to_owned));
    state.refresh_bearers.lock().push(bearer(&headers));

    let mut gate = state.gate.subscribe();
    let _ = gate.wait_for(|open| *open).await;

    let n = state.renewals.fetch_add(1, Ordering::SeqCst) + 1;
    let mode = *state.mode.lock();
    if let RenewalMode::Reject(status) = mode {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::UNAUTHORIZED);
        return error(status, "SESSION_EXPIRED", "refresh session expired");
    }

    let expected = format!("{SESSION_COOKIE}={SESSION_VALUE}");
    let has_session = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.split(';').any(|part| part.trim() == expected));
    if !has_session {
        return error(StatusCode::UNAUTHORIZED, "NO_SESSION", "missing session cookie");
    }

    let token = format!("renewed-{n}");
    *state.valid.lock() = Some(token.clone());
    Json(json!({ "token": token })).into_response()
}

async fn login(State(state): State<Arc<StubState>>, headers: HeaderMap, body: Bytes) -> Response {
    record(&state, &Method::POST, "/api/v1/auth/login", &headers, &body);
    *state.valid.lock() = Some(SIGNED_IN_TOKEN.to_owned());
    let cookie = format!("{SESSION_COOKIE}={SESSION_VALUE}; Path=/; HttpOnly");
    let session_id = uuid::Uuid::new_v4().to_string();
    (
        [("set-cookie", cookie)],
        Json(json!({ "access_token": SIGNED_IN_TOKEN, "session_id": session_id })),
    )
        .into_response()
}

async fn logout(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    record(&state, &Method::POST, "/api/v1/auth/logout", &headers, &[]);
    StatusCode::NO_CONTENT.into_response()
}

/// Navigator that records every redirect.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    count: AtomicU32,
    last: Mutex<Option<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_sign_in(&self, sign_in_url: &str) {
        self.count.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(sign_in_url.to_owned());
    }
}

/// Client config pointed at `stub`, with a valid session cookie.
pub fn stub_config(stub: &StubApi) -> ClientConfig {
    let mut config = ClientConfig::new(stub.base_url());
    config.session_cookie = Some(stub.session_cookie());
    config.timeout_ms = 5_000;
    config
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A local address with nothing listening on it.
pub fn closed_port_url() -> anyhow::Result<String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

/// Assert that an expression is `Err` whose display contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
