// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide holder of the current access credential.
//!
//! The store is a cheap `Clone` handle; every clone sees the same slot. The
//! credential is only ever replaced or cleared wholesale.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    /// The raw token, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Shared slot holding the current credential, if any.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    slot: Arc<RwLock<Option<Credential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an initial credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self { slot: Arc::new(RwLock::new(Some(credential))) }
    }

    pub fn read(&self) -> Option<Credential> {
        self.slot.read().clone()
    }

    pub fn replace(&self, credential: Credential) {
        *self.slot.write() = Some(credential);
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_present(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
