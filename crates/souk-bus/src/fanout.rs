// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process fan-out bus.
//!
//! One `tokio::sync::broadcast` channel per topic, with per-topic subscriber
//! membership tracked alongside it. Membership mutations happen under the
//! topic's map entry, giving per-topic atomicity without a global lock.

use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use souk_core::{BusEvent, ConnectionId, FanoutBus, SoukError, Topic, UserId};

/// Per-topic channel capacity. Receivers that fall further behind than this
/// observe a lag error and miss events.
const TOPIC_CAPACITY: usize = 1024;

struct TopicState {
    tx: broadcast::Sender<BusEvent>,
    members: HashMap<ConnectionId, UserId>,
}

/// DashMap-backed [`FanoutBus`] for a single process.
///
/// The trait seam keeps gateway logic agnostic: a networked pub/sub backend
/// would pump its subscription into the same local broadcast channels.
#[derive(Default)]
pub struct InProcessBus {
    topics: DashMap<Topic, TopicState>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of topics with at least one subscriber. Test/diagnostic hook.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[async_trait]
impl FanoutBus for InProcessBus {
    fn subscribe(
        &self,
        topic: Topic,
        conn: ConnectionId,
        user: UserId,
    ) -> broadcast::Receiver<BusEvent> {
        let mut state = self.topics.entry(topic).or_insert_with(|| TopicState {
            tx: broadcast::channel(TOPIC_CAPACITY).0,
            members: HashMap::new(),
        });
        state.members.insert(conn, user);
        state.tx.subscribe()
    }

    fn unsubscribe(&self, topic: &Topic, conn: &ConnectionId) {
        if let Some(mut state) = self.topics.get_mut(topic) {
            state.members.remove(conn);
            let empty = state.members.is_empty();
            drop(state);
            if empty {
                // Drop the channel once the last member leaves; lingering
                // receivers observe Closed.
                self.topics.remove_if(topic, |_, s| s.members.is_empty());
            }
        }
    }

    async fn publish(&self, topic: &Topic, event: BusEvent) -> Result<usize, SoukError> {
        let reached = match self.topics.get(topic) {
            // send() errors only when there are no receivers; that is an
            // empty fan-out, not a failure.
            Some(state) => state.tx.send(event).unwrap_or(0),
            None => 0,
        };
        trace!(topic = %topic, reached, "published bus event");
        Ok(reached)
    }

    async fn members(&self, topic: &Topic) -> Result<Vec<UserId>, SoukError> {
        Ok(self
            .topics
            .get(topic)
            .map(|state| {
                state
                    .members
                    .values()
                    .copied()
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default())
    }
}
