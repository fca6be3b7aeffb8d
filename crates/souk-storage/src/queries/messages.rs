// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message operations: append, latest, mark-read, paginated history.

use rusqlite::params;
use souk_core::{ChatMessage, MessageId, RoomId, SoukError, UserId};

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::row_to_message;

/// Append a message to the room's log.
///
/// `created_at` is taken on the writer thread at persistence time, so the
/// stored order of concurrent sends is arrival-at-store order, never
/// client-declared time.
pub async fn save_message(
    db: &Database,
    room_id: &RoomId,
    sender_id: &UserId,
    content: &str,
) -> Result<ChatMessage, SoukError> {
    let id = MessageId::new();
    let room_id = *room_id;
    let sender_id = *sender_id;
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let created_at = now_rfc3339();
            conn.execute(
                "INSERT INTO chat_messages (id, room_id, sender_id, content, created_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![
                    id.to_string(),
                    room_id.to_string(),
                    sender_id.to_string(),
                    content,
                    created_at,
                ],
            )?;
            Ok(ChatMessage {
                id,
                room_id,
                sender_id,
                content,
                created_at,
                is_read: false,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent message in the room, if any.
pub async fn latest_message(
    db: &Database,
    room_id: &RoomId,
) -> Result<Option<ChatMessage>, SoukError> {
    let room_id = room_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, room_id, sender_id, content, created_at, is_read
                 FROM chat_messages WHERE room_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![room_id],
                row_to_message,
            );
            match result {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark messages read on behalf of `reader`, up to and including `upto`.
///
/// Only unread messages sent by the other party flip; `is_read` never
/// reverts. An `upto` id that is not in the room matches nothing and flips
/// zero rows. Returns the number of rows changed.
pub async fn mark_read(
    db: &Database,
    room_id: &RoomId,
    upto: &MessageId,
    reader_id: &UserId,
) -> Result<u64, SoukError> {
    let room_id = room_id.to_string();
    let upto = upto.to_string();
    let reader_id = reader_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE chat_messages SET is_read = 1
                 WHERE room_id = ?1 AND sender_id != ?2 AND is_read = 0
                   AND created_at <= (
                       SELECT created_at FROM chat_messages
                       WHERE id = ?3 AND room_id = ?1
                   )",
                params![room_id, reader_id, upto],
            )?;
            Ok(changed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Paginated history, newest first. `before` is an exclusive upper bound on
/// `created_at`; `None` starts from the latest message.
pub async fn messages_before(
    db: &Database,
    room_id: &RoomId,
    before: Option<&str>,
    limit: i64,
) -> Result<Vec<ChatMessage>, SoukError> {
    let room_id = room_id.to_string();
    let before = before.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match &before {
                Some(bound) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, room_id, sender_id, content, created_at, is_read
                         FROM chat_messages WHERE room_id = ?1 AND created_at < ?2
                         ORDER BY created_at DESC, rowid DESC LIMIT ?3",
                    )?;
                    let rows = stmt.query_map(params![room_id, bound, limit], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, room_id, sender_id, content, created_at, is_read
                         FROM chat_messages WHERE room_id = ?1
                         ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![room_id, limit], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
