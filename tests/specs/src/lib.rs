// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness for end-to-end renewal scenarios.
//!
//! Each [`Session`] owns a stub identity API on an ephemeral port and an
//! [`AuthClient`] pointed at it, holding an initial credential the stub treats
//! as expired.

use std::sync::Arc;
use std::time::Duration;

use authflight::test_support::{stub_config, wait_until, RecordingNavigator, StubApi};
use authflight::{AuthClient, AuthEvent, ClientConfig};
use tokio::sync::broadcast;

/// How long a scenario waits for callers to queue up.
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Credential installed before the first call.
pub const INITIAL_TOKEN: &str = "T1";

/// A stub API, a client holding [`INITIAL_TOKEN`], and the navigator it reports to.
pub struct Session {
    pub stub: StubApi,
    pub navigator: Arc<RecordingNavigator>,
    pub client: AuthClient,
    pub events: broadcast::Receiver<AuthEvent>,
}

/// Builder for a [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    configure: Option<Box<dyn FnOnce(&StubApi, &mut ClientConfig)>>,
}

impl SessionBuilder {
    /// Adjust the client config before the client is built.
    pub fn config(mut self, f: impl FnOnce(&StubApi, &mut ClientConfig) + 'static) -> Self {
        self.configure = Some(Box::new(f));
        self
    }

    pub async fn start(self) -> anyhow::Result<Session> {
        let stub = StubApi::start().await?;
        let navigator = RecordingNavigator::new();
        let mut config = stub_config(&stub);
        config.token = Some(INITIAL_TOKEN.to_owned());
        if let Some(configure) = self.configure {
            configure(&stub, &mut config);
        }
        let client = AuthClient::new(config, navigator.clone())?;
        let events = client.subscribe();
        Ok(Session { stub, navigator, client, events })
    }
}

impl Session {
    pub fn build() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Start with the default configuration.
    pub async fn start() -> anyhow::Result<Self> {
        Self::build().start().await
    }

    /// Wait until `n` callers are parked behind the in-flight renewal.
    pub async fn wait_queued(&self, n: usize) -> anyhow::Result<()> {
        let coordinator = self.client.coordinator();
        if !wait_until(QUEUE_TIMEOUT, || coordinator.pending_len() == n).await {
            anyhow::bail!(
                "expected {n} queued callers within {QUEUE_TIMEOUT:?}, have {}",
                coordinator.pending_len()
            );
        }
        Ok(())
    }

    /// Drain every event broadcast so far.
    pub fn drain_events(&mut self) -> Vec<AuthEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
