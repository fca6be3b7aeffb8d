// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection protocol events.
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "join", "roomId": "..."}
//! {"type": "leave", "roomId": "..."}
//! {"type": "send", "roomId": "...", "content": "Hello"}
//! {"type": "checkPresence", "userId": "..."}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "ack", "status": "ok", "message": {...}}
//! {"type": "ack", "status": "error", "reason": "..."}
//! {"type": "presence", "userId": "...", "online": true}
//! {"type": "newMessage", "message": {...}}
//! {"type": "messageRead", "roomId": "...", "messageId": "...", "readerId": "..."}
//! {"type": "userJoinedRoom", ...} {"type": "userLeftRoom", ...}
//! {"type": "userOnline", ...} {"type": "userOffline", ...}
//! {"type": "chatNotification", "roomId": "...", "message": {...}}
//! ```

use serde::{Deserialize, Serialize};
use tracing::error;

use souk_core::{BusEvent, ChatMessage, MessageId, RoomId, SoukError, UserId};

/// An event received from a client connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Join { room_id: String },
    #[serde(rename_all = "camelCase")]
    Leave { room_id: String },
    #[serde(rename_all = "camelCase")]
    Send { room_id: String, content: String },
    #[serde(rename_all = "camelCase")]
    CheckPresence { user_id: String },
}

/// Acknowledgment status for a client event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

/// An event pushed to a client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Ack {
        status: AckStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<ChatMessage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Presence { user_id: UserId, online: bool },
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
    #[serde(rename_all = "camelCase")]
    ChatNotification { room_id: RoomId, message: ChatMessage },
}

impl ServerEvent {
    /// Successful send acknowledgment carrying the persisted message.
    pub fn ack_ok(message: ChatMessage) -> Self {
        ServerEvent::Ack {
            status: AckStatus::Ok,
            message: Some(message),
            reason: None,
        }
    }

    /// Failure acknowledgment.
    ///
    /// Caller-attributable errors surface their specific reason; internal
    /// failures are logged here and surfaced opaquely so nothing about the
    /// store leaks to clients.
    pub fn ack_err(err: &SoukError) -> Self {
        let reason = if err.is_caller_fault() {
            err.to_string()
        } else {
            error!(error = %err, "internal failure surfaced to client as opaque ack");
            "internal error, please retry".to_string()
        };
        ServerEvent::Ack {
            status: AckStatus::Error,
            message: None,
            reason: Some(reason),
        }
    }
}

impl From<BusEvent> for ServerEvent {
    fn from(event: BusEvent) -> Self {
        match event {
            BusEvent::NewMessage { message } => ServerEvent::NewMessage { message },
            BusEvent::MessageRead {
                room_id,
                message_id,
                reader_id,
            } => ServerEvent::MessageRead {
                room_id,
                message_id,
                reader_id,
            },
            BusEvent::UserJoinedRoom { room_id, user_id } => {
                ServerEvent::UserJoinedRoom { room_id, user_id }
            }
            BusEvent::UserLeftRoom { room_id, user_id } => {
                ServerEvent::UserLeftRoom { room_id, user_id }
            }
            BusEvent::UserOnline { user_id } => ServerEvent::UserOnline { user_id },
            BusEvent::UserOffline { user_id } => ServerEvent::UserOffline { user_id },
            BusEvent::ChatNotification { room_id, message } => {
                ServerEvent::ChatNotification { room_id, message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_deserialize_with_protocol_tags() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"type":"join","roomId":"r-1"}"#).unwrap();
        assert!(matches!(join, ClientEvent::Join { ref room_id } if room_id == "r-1"));

        let send: ClientEvent =
            serde_json::from_str(r#"{"type":"send","roomId":"r-1","content":"Hi"}"#).unwrap();
        assert!(matches!(send, ClientEvent::Send { ref content, .. } if content == "Hi"));

        let check: ClientEvent =
            serde_json::from_str(r#"{"type":"checkPresence","userId":"u-1"}"#).unwrap();
        assert!(matches!(check, ClientEvent::CheckPresence { ref user_id } if user_id == "u-1"));
    }

    #[test]
    fn unknown_client_event_is_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"type":"editMessage"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn ack_ok_serializes_without_reason() {
        let msg = ChatMessage {
            id: MessageId::new(),
            room_id: RoomId::new(),
            sender_id: UserId::new(),
            content: "Hi".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            is_read: false,
        };
        let json = serde_json::to_value(ServerEvent::ack_ok(msg)).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["status"], "ok");
        assert!(json.get("reason").is_none());
        assert!(json["message"].get("createdAt").is_some());
    }

    #[test]
    fn ack_err_surfaces_validation_reason_verbatim() {
        let err = SoukError::Validation("malformed room id".to_string());
        let json = serde_json::to_value(ServerEvent::ack_err(&err)).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json["reason"].as_str().unwrap().contains("malformed room id"));
    }

    #[test]
    fn ack_err_hides_store_details() {
        let err = SoukError::store(std::io::Error::other("disk exploded at /var/lib"));
        let json = serde_json::to_value(ServerEvent::ack_err(&err)).unwrap();
        let reason = json["reason"].as_str().unwrap();
        assert!(!reason.contains("disk"), "internal detail leaked: {reason}");
        assert!(reason.contains("retry"));
    }

    #[test]
    fn bus_events_map_to_protocol_events() {
        let user = UserId::new();
        let ev: ServerEvent = BusEvent::UserOnline { user_id: user }.into();
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "userOnline");
        assert_eq!(json["userId"], serde_json::to_value(user).unwrap());
    }
}
