// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session termination: wipe the credential and send the user back to sign-in.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::credential::CredentialStore;
use crate::event::AuthEvent;

/// Capability to move the user to the re-authentication entry point.
pub trait Navigator: Send + Sync {
    fn redirect_to_sign_in(&self, sign_in_url: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to_sign_in(&self, sign_in_url: &str) {
        self(sign_in_url)
    }
}

/// Navigator for headless use: logs where the user has to sign in again.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_sign_in(&self, sign_in_url: &str) {
        warn!(sign_in_url, "session ended, sign in again");
    }
}

/// Ends the session: clears the store, emits `SessionEnded`, then navigates.
#[derive(Clone)]
pub struct SessionTerminator {
    store: CredentialStore,
    navigator: Arc<dyn Navigator>,
    sign_in_url: String,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionTerminator {
    pub fn new(
        store: CredentialStore,
        navigator: Arc<dyn Navigator>,
        sign_in_url: String,
        events: broadcast::Sender<AuthEvent>,
    ) -> Self {
        Self { store, navigator, sign_in_url, events }
    }

    pub fn terminate(&self, reason: &str) {
        self.store.clear();
        warn!(reason, "ending session");
        let _ = self.events.send(AuthEvent::SessionEnded { reason: reason.to_owned() });
        self.navigator.redirect_to_sign_in(&self.sign_in_url);
    }
}

#[cfg(test)]
#[path = "terminator_tests.rs"]
mod tests;
