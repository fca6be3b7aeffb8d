// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-connection state.
//!
//! A [`Session`] is owned by the task handling its socket; the gateway's
//! shared registry only holds a [`ConnectionEntry`] (identity + push-back
//! sender), never the socket itself.

use std::collections::HashSet;

use tokio::sync::mpsc;

use souk_core::{ConnectionId, Role, RoomId, UserId};

use crate::events::ServerEvent;

/// What the gateway registry knows about a live connection: the verified
/// identity tagged at authentication, and a locator usable to push events
/// back to the socket.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub user_id: UserId,
    pub role: Role,
    pub sender: mpsc::Sender<ServerEvent>,
}

/// Mutable per-connection state, owned by the socket task. Destroyed on
/// disconnect; never persisted.
#[derive(Debug)]
pub struct Session {
    pub conn_id: ConnectionId,
    pub user_id: UserId,
    pub role: Role,
    rooms: HashSet<RoomId>,
}

impl Session {
    pub fn new(conn_id: ConnectionId, user_id: UserId, role: Role) -> Self {
        Self {
            conn_id,
            user_id,
            role,
            rooms: HashSet::new(),
        }
    }

    /// Whether this connection currently holds a subscription to the room.
    pub fn is_joined(&self, room_id: &RoomId) -> bool {
        self.rooms.contains(room_id)
    }

    pub(crate) fn add_room(&mut self, room_id: RoomId) {
        self.rooms.insert(room_id);
    }

    pub(crate) fn remove_room(&mut self, room_id: &RoomId) -> bool {
        self.rooms.remove(room_id)
    }

    /// The rooms this connection is subscribed to.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.iter()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
