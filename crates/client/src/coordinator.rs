// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight credential renewal.
//!
//! When a response says the credential expired, the first caller to notice
//! starts a renewal and every later caller parks on a oneshot channel until
//! that renewal settles. On success the new credential is installed before any
//! waiter is released, so the whole batch retries with the same value. On
//! failure the session is terminated and the batch is rejected with the same
//! error.
//!
//! Flag and queue share one mutex that is never held across an `.await`:
//! "set refreshing" and "join the queue" are decided in one critical section,
//! and "clear refreshing" and "take the queue" happen in another.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::credential::{Credential, CredentialStore};
use crate::dispatcher::RetryDispatcher;
use crate::error::RequestError;
use crate::event::AuthEvent;
use crate::renewal::RenewalExchange;
use crate::request::{ApiResponse, RequestDescriptor};
use crate::signal::ExpirySignal;
use crate::terminator::SessionTerminator;

/// Result of one renewal, shared by every caller that waited on it.
pub type RenewalOutcome = Result<Credential, RequestError>;

/// A caller parked until the in-flight renewal settles.
struct PendingCaller {
    tx: oneshot::Sender<RenewalOutcome>,
}

#[derive(Default)]
struct CoordinatorState {
    refreshing: bool,
    pending: Vec<PendingCaller>,
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<RenewalOutcome>),
}

pub struct RefreshCoordinator {
    state: Mutex<CoordinatorState>,
    signal: ExpirySignal,
    renewal: RenewalExchange,
    dispatcher: RetryDispatcher,
    store: CredentialStore,
    terminator: SessionTerminator,
    events: broadcast::Sender<AuthEvent>,
}

impl RefreshCoordinator {
    pub fn new(
        signal: ExpirySignal,
        renewal: RenewalExchange,
        dispatcher: RetryDispatcher,
        store: CredentialStore,
        terminator: SessionTerminator,
        events: broadcast::Sender<AuthEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CoordinatorState::default()),
            signal,
            renewal,
            dispatcher,
            store,
            terminator,
            events,
        })
    }

    /// Whether a renewal is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of callers parked on the in-flight renewal.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether `response` to `descriptor` is a recoverable expiry.
    pub fn is_recoverable(&self, descriptor: &RequestDescriptor, response: &ApiResponse) -> bool {
        !descriptor.is_retried() && self.signal.matches(response)
    }

    /// Settle a failed first attempt.
    ///
    /// Anything other than a recoverable expiry is returned to the caller as
    /// the mapped error. An expiry waits for (or starts) the single renewal
    /// and then reissues the call once with the renewed credential.
    pub async fn recover(
        self: &Arc<Self>,
        mut descriptor: RequestDescriptor,
        response: ApiResponse,
    ) -> Result<ApiResponse, RequestError> {
        if !self.is_recoverable(&descriptor, &response) {
            return Err(response.to_error());
        }
        descriptor.mark_retried();

        let credential = self.fresh_credential().await?;
        self.dispatcher.reissue(&descriptor, &credential).await
    }

    /// Wait for the outcome of the in-flight renewal, starting one if none is
    /// running.
    pub async fn fresh_credential(self: &Arc<Self>) -> RenewalOutcome {
        let role = {
            let mut state = self.state.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.pending.push(PendingCaller { tx });
                debug!(queued = state.pending.len(), "renewal in flight, queueing caller");
                Role::Waiter(rx)
            } else {
                state.refreshing = true;
                Role::Leader
            }
        };

        match role {
            Role::Waiter(rx) => rx.await.unwrap_or(Err(RequestError::RefreshAbandoned)),
            Role::Leader => {
                // Spawned so a dropped leader cannot leave the flag set.
                let coordinator = Arc::clone(self);
                let task = tokio::spawn(async move { coordinator.run_renewal().await });
                match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(err = %e, "renewal task did not complete");
                        let outcome = Err(RequestError::RefreshAbandoned);
                        self.settle(&outcome);
                        outcome
                    }
                }
            }
        }
    }

    async fn run_renewal(&self) -> RenewalOutcome {
        info!(url = %self.renewal.url(), "credential expired, renewing");
        let outcome = self.renewal.renew().await;
        match outcome {
            Ok(ref credential) => {
                self.store.replace(credential.clone());
                let waiters = self.settle(&outcome);
                info!(waiters, "credential renewed");
                let _ = self.events.send(AuthEvent::Refreshed { waiters });
            }
            Err(ref err) => {
                warn!(err = %err, "credential renewal failed");
                let _ = self.events.send(AuthEvent::RefreshFailed { error: err.to_string() });
                self.terminator.terminate("credential renewal failed");
                let waiters = self.settle(&outcome);
                debug!(waiters, "rejected queued callers");
            }
        }
        outcome
    }

    /// Return to idle and hand `outcome` to every queued caller.
    fn settle(&self, outcome: &RenewalOutcome) -> usize {
        let pending = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };
        let waiters = pending.len();
        for caller in pending {
            // A receiver that went away has nothing left to retry.
            let _ = caller.tx.send(outcome.clone());
        }
        waiters
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
