// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Session lifecycle events broadcast by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A credential was installed by an explicit sign-in.
    SignedIn,
    /// A renewal succeeded; `waiters` queued callers were released with it.
    Refreshed { waiters: usize },
    /// A renewal failed; the session is about to end.
    #[serde(rename = "refresh:failed")]
    RefreshFailed { error: String },
    /// The credential was cleared and the user sent back to sign-in.
    SessionEnded { reason: String },
}

/// Capacity of the event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
