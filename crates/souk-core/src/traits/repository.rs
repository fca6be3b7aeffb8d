// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable room/message repository consumed by the gateway.

use async_trait::async_trait;

use crate::error::SoukError;
use crate::types::{ChatMessage, ChatRoom, MessageId, RoomId, UserId};

/// Append-only message log plus per-room membership.
#[async_trait]
pub trait ChatRepository: Send + Sync + 'static {
    /// Get the room for a customer/vendor pair, creating it on first
    /// contact. Concurrent first-contact calls converge on the same room
    /// via the store's uniqueness constraint, not application locking.
    async fn create_or_get_room(
        &self,
        customer_id: UserId,
        vendor_id: UserId,
    ) -> Result<ChatRoom, SoukError>;

    /// Look up a room by id.
    async fn room(&self, id: &RoomId) -> Result<Option<ChatRoom>, SoukError>;

    /// Append a message. The store assigns `created_at` at persistence time;
    /// this timestamp, not any client-declared time, orders the room.
    async fn save_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<ChatMessage, SoukError>;

    /// Mark messages in the room read on behalf of `reader`, up to and
    /// including `upto`. Only messages sent by the other party are affected;
    /// `is_read` is monotonic and never reverts. Returns the number of rows
    /// flipped.
    async fn mark_read(
        &self,
        room_id: &RoomId,
        upto: &MessageId,
        reader_id: &UserId,
    ) -> Result<u64, SoukError>;

    /// The most recent message in the room, if any.
    async fn latest_message(&self, room_id: &RoomId) -> Result<Option<ChatMessage>, SoukError>;

    /// Paginated history, newest first. `before` is an exclusive RFC 3339
    /// upper bound on `created_at`; `None` starts from the latest message.
    async fn messages_before(
        &self,
        room_id: &RoomId,
        before: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, SoukError>;
}
