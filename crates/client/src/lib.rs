// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authflight: an HTTP client that renews an expired credential mid-flight
//! with at most one renewal in flight per client.

pub mod authenticator;
pub mod cli;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod renewal;
pub mod request;
pub mod signal;
pub mod terminator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tls;

pub use client::AuthClient;
pub use config::ClientConfig;
pub use credential::{Credential, CredentialStore};
pub use error::RequestError;
pub use event::AuthEvent;
pub use request::{ApiResponse, RequestDescriptor};
pub use terminator::Navigator;
