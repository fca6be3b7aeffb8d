// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process presence registry.
//!
//! A single shared hash table; all operations are atomic per key. Suitable
//! for one process or for tests; the [`PresenceStore`] seam lets a
//! networked store take its place for a multi-instance fleet without
//! touching gateway logic.

use async_trait::async_trait;
use dashmap::DashMap;

use souk_core::{Locator, PresenceStore, SoukError, UserId};

/// DashMap-backed [`PresenceStore`].
///
/// TODO: entries leak when a gateway instance dies before running its
/// disconnect handlers, leaving stale "online" reads. Add a lease/expiry on
/// entries so they age out without cleanup.
#[derive(Default)]
pub struct InProcessPresence {
    entries: DashMap<UserId, Locator>,
}

impl InProcessPresence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceStore for InProcessPresence {
    async fn set(&self, user: UserId, locator: Locator) -> Result<(), SoukError> {
        // Last-connect-wins: a fresh connection overwrites the old entry.
        self.entries.insert(user, locator);
        Ok(())
    }

    async fn get(&self, user: &UserId) -> Result<Option<Locator>, SoukError> {
        Ok(self.entries.get(user).map(|e| e.value().clone()))
    }

    async fn remove_if(&self, user: &UserId, locator: &Locator) -> Result<bool, SoukError> {
        let removed = self.entries.remove_if(user, |_, v| v == locator);
        Ok(removed.is_some())
    }

    async fn count(&self) -> Result<usize, SoukError> {
        Ok(self.entries.len())
    }
}
