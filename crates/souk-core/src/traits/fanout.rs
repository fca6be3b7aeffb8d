// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish/subscribe backbone for broadcasting events across the gateway fleet.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::SoukError;
use crate::types::{BusEvent, ConnectionId, Topic, UserId};

/// Topic-based fan-out with per-topic subscriber membership.
///
/// Subscribing registers `(connection, user)` as a member of the topic and
/// returns a receiver for its events; this membership is what the
/// notification router consults to answer "is the receiver currently viewing
/// this room anywhere in the fleet", deliberately distinct from global
/// presence. Delivery is at-least-once; receivers that fall far behind may
/// observe a lag error and miss events.
#[async_trait]
pub trait FanoutBus: Send + Sync + 'static {
    /// Subscribe `conn` (owned by `user`) to a topic. Subscribing the same
    /// connection twice returns a fresh receiver without duplicating
    /// membership.
    fn subscribe(
        &self,
        topic: Topic,
        conn: ConnectionId,
        user: UserId,
    ) -> broadcast::Receiver<BusEvent>;

    /// Drop `conn`'s membership in the topic. Idempotent.
    fn unsubscribe(&self, topic: &Topic, conn: &ConnectionId);

    /// Broadcast an event to all current subscribers of the topic, across
    /// all gateway instances. Returns the number of receivers reached.
    async fn publish(&self, topic: &Topic, event: BusEvent) -> Result<usize, SoukError>;

    /// The distinct users currently subscribed to the topic.
    async fn members(&self, topic: &Topic) -> Result<Vec<UserId>, SoukError>;
}
