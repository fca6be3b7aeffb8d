// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat room operations.

use rusqlite::params;
use souk_core::{ChatRoom, RoomId, SoukError, UserId};

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::row_to_room;

/// Get the room for a customer/vendor pair, creating it on first contact.
///
/// The insert is `ON CONFLICT DO NOTHING` against the `(customer_id,
/// vendor_id)` uniqueness constraint, so two concurrent first-contact calls
/// both land on the same row; the loser's candidate id is simply discarded.
pub async fn create_or_get_room(
    db: &Database,
    customer_id: UserId,
    vendor_id: UserId,
) -> Result<ChatRoom, SoukError> {
    let candidate_id = RoomId::new();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_rooms (id, customer_id, vendor_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (customer_id, vendor_id) DO NOTHING",
                params![
                    candidate_id.to_string(),
                    customer_id.to_string(),
                    vendor_id.to_string(),
                    now_rfc3339(),
                ],
            )?;
            let room = conn.query_row(
                "SELECT id, customer_id, vendor_id, created_at
                 FROM chat_rooms WHERE customer_id = ?1 AND vendor_id = ?2",
                params![customer_id.to_string(), vendor_id.to_string()],
                row_to_room,
            )?;
            Ok(room)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a room by id.
pub async fn room(db: &Database, id: &RoomId) -> Result<Option<ChatRoom>, SoukError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, customer_id, vendor_id, created_at
                 FROM chat_rooms WHERE id = ?1",
                params![id],
                row_to_room,
            );
            match result {
                Ok(room) => Ok(Some(room)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}
