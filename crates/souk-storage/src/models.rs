// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping helpers for storage entities.
//!
//! The canonical types live in `souk-core::types`; this module maps SQLite
//! rows (ids and timestamps stored as TEXT) back into them.

pub use souk_core::types::{ChatMessage, ChatRoom};

use std::str::FromStr;

/// Parse a TEXT column into a typed id, surfacing failures as conversion
/// errors so they carry the column index.
pub(crate) fn parse_id<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a `chat_rooms` row selected as
/// `(id, customer_id, vendor_id, created_at)`.
pub(crate) fn row_to_room(row: &rusqlite::Row<'_>) -> Result<ChatRoom, rusqlite::Error> {
    Ok(ChatRoom {
        id: parse_id(0, row.get(0)?)?,
        customer_id: parse_id(1, row.get(1)?)?,
        vendor_id: parse_id(2, row.get(2)?)?,
        created_at: row.get(3)?,
    })
}

/// Map a `chat_messages` row selected as
/// `(id, room_id, sender_id, content, created_at, is_read)`.
pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> Result<ChatMessage, rusqlite::Error> {
    Ok(ChatMessage {
        id: parse_id(0, row.get(0)?)?,
        room_id: parse_id(1, row.get(1)?)?,
        sender_id: parse_id(2, row.get(2)?)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        is_read: row.get(5)?,
    })
}
