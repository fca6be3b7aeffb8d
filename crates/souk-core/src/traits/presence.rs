// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared presence registry: `userId -> locator` for the whole fleet.

use async_trait::async_trait;

use crate::error::SoukError;
use crate::types::{Locator, UserId};

/// A single logical hash table shared by all gateway instances.
///
/// Entries are ephemeral and rebuilt purely from live connections; a restart
/// of the backing store makes every user appear offline until they reconnect,
/// which is an acceptable degraded state, not a failure. Implementations must
/// provide per-key atomicity; no cross-key transactions are required.
///
/// Absence of an entry means "possibly offline", never a hard guarantee:
/// an instance that crashes before its disconnect handler runs leaves its
/// entries behind.
#[async_trait]
pub trait PresenceStore: Send + Sync + 'static {
    /// Record that `user` is connected at `locator`. Overwrites any existing
    /// entry (last-connect-wins).
    async fn set(&self, user: UserId, locator: Locator) -> Result<(), SoukError>;

    /// Point lookup. Returns the current locator, or `None` if the user has
    /// no live connection registered.
    async fn get(&self, user: &UserId) -> Result<Option<Locator>, SoukError>;

    /// Delete the entry for `user` only if it still points at `locator`.
    ///
    /// Disconnect teardown uses this so that a user who already reconnected
    /// elsewhere (last-connect-wins) is not wiped offline by the old
    /// connection's cleanup. Returns whether an entry was removed.
    async fn remove_if(&self, user: &UserId, locator: &Locator) -> Result<bool, SoukError>;

    /// Number of users currently registered as online.
    async fn count(&self) -> Result<usize, SoukError>;
}
