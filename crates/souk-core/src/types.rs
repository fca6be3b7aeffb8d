// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the souk workspace.
//!
//! Wire-facing structs serialize with camelCase field names to match the
//! connection protocol (`roomId`, `senderId`, `createdAt`, ...).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::SoukError;

/// Inclusive bounds on chat message content length, in characters.
pub const MIN_CONTENT_CHARS: usize = 1;
pub const MAX_CONTENT_CHARS: usize = 2000;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a user (customer or vendor).
    UserId
}
uuid_id! {
    /// Unique identifier for a chat room.
    RoomId
}
uuid_id! {
    /// Unique identifier for a chat message.
    MessageId
}
uuid_id! {
    /// Unique identifier for a single live connection, scoped to the
    /// gateway instance that accepted it.
    ConnectionId
}

/// Role attached to a verified connection identity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
}

/// A 1:1 conversation channel between one customer and one vendor.
///
/// At most one room exists per `(customer_id, vendor_id)` pair; the storage
/// layer enforces this with a uniqueness constraint so concurrent
/// first-contact requests converge on the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: RoomId,
    pub customer_id: UserId,
    pub vendor_id: UserId,
    /// RFC 3339 creation timestamp, assigned by the store.
    pub created_at: String,
}

impl ChatRoom {
    /// Whether the given user is one of the room's two parties.
    pub fn is_member(&self, user: &UserId) -> bool {
        self.customer_id == *user || self.vendor_id == *user
    }

    /// The room member who is not `user`, or `None` if `user` is not a member.
    pub fn other_party(&self, user: &UserId) -> Option<UserId> {
        if self.customer_id == *user {
            Some(self.vendor_id)
        } else if self.vendor_id == *user {
            Some(self.customer_id)
        } else {
            None
        }
    }
}

/// A persisted chat message. Immutable once written, except for the
/// monotonic `is_read` flag (false -> true, never back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub content: String,
    /// RFC 3339 timestamp assigned at persistence time. This is the
    /// canonical ordering key for the room, never client-supplied.
    pub created_at: String,
    pub is_read: bool,
}

/// Validate message content length (1-2000 characters).
pub fn validate_content(content: &str) -> Result<(), SoukError> {
    let chars = content.chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(SoukError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    if chars > MAX_CONTENT_CHARS {
        return Err(SoukError::Validation(format!(
            "message content exceeds {MAX_CONTENT_CHARS} characters (got {chars})"
        )));
    }
    Ok(())
}

/// Where a user is currently connected: which gateway instance accepted the
/// connection, and which connection on that instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locator {
    pub instance_id: String,
    pub connection_id: ConnectionId,
}

/// A fan-out topic. Rooms carry chat traffic, user topics carry
/// cross-instance deliveries to a single user, and the presence topic
/// carries fleet-wide online/offline events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Room(RoomId),
    User(UserId),
    Presence,
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Room(id) => write!(f, "room:{id}"),
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Presence => write!(f, "presence"),
        }
    }
}

/// An event published on the fan-out bus.
///
/// Tag and field names match the connection protocol so gateway instances
/// can forward bus events to sockets without re-mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BusEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage { message: ChatMessage },
    #[serde(rename_all = "camelCase")]
    MessageRead {
        room_id: RoomId,
        message_id: MessageId,
        reader_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    UserJoinedRoom { room_id: RoomId, user_id: UserId },
    #[serde(rename_all = "camelCase")]
    UserLeftRoom { room_id: RoomId, user_id: UserId },
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: UserId },
    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: UserId },
    /// Cross-instance fallback delivery to a user who is online but not
    /// subscribed to the room.
    #[serde(rename_all = "camelCase")]
    ChatNotification { room_id: RoomId, message: ChatMessage },
}

/// Opaque payload attached to a push notification so the client can route
/// the tap back to the right conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub room_id: RoomId,
    pub message_id: MessageId,
    pub kind: String,
}

/// A push notification job, created by the notification router and owned by
/// the durable delivery queue until a worker consumes it. At-least-once
/// delivery is acceptable on this path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundNotificationJob {
    pub token: String,
    pub title: String,
    pub body: String,
    pub payload: PushPayload,
}

impl OutboundNotificationJob {
    /// Build the job for a newly persisted chat message.
    pub fn for_message(token: String, message: &ChatMessage) -> Self {
        Self {
            token,
            title: "New Message".to_string(),
            body: message.content.clone(),
            payload: PushPayload {
                room_id: message.room_id,
                message_id: message.id,
                kind: "chat_message".to_string(),
            },
        }
    }
}

/// A job as handed out by the queue, with its row id and attempt count.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: i64,
    pub job: OutboundNotificationJob,
    pub attempts: i32,
}
