// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway core logic, independent of any socket transport.
//!
//! Every operation here is driven by the WebSocket layer in production and
//! directly by tests; nothing below this module touches a socket. All
//! cross-connection state lives in the presence store and fan-out bus, which
//! is what lets any instance serve any connection.

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use souk_core::{
    validate_content, BusEvent, ChatMessage, ChatRepository, ConnectionId, FanoutBus, Locator,
    PresenceStore, RoomId, SoukError, Topic, UserId,
};
use souk_notify::NotificationRouter;

use crate::auth::Claims;
use crate::connection::{ConnectionEntry, Session};
use crate::events::ServerEvent;

/// Bus receivers handed to a freshly connected socket: its own user topic
/// (cross-instance deliveries) and the fleet presence topic.
pub struct SessionStreams {
    pub user_events: broadcast::Receiver<BusEvent>,
    pub presence_events: broadcast::Receiver<BusEvent>,
}

/// The connection gateway.
pub struct Gateway {
    instance_id: String,
    repo: Arc<dyn ChatRepository>,
    presence: Arc<dyn PresenceStore>,
    bus: Arc<dyn FanoutBus>,
    router: NotificationRouter,
    connections: DashMap<ConnectionId, ConnectionEntry>,
    /// Per-room send sequencing: persist + publish happen under the room's
    /// lock so broadcast order provably equals persistence order even when
    /// sender tasks interleave.
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl Gateway {
    pub fn new(
        instance_id: String,
        repo: Arc<dyn ChatRepository>,
        presence: Arc<dyn PresenceStore>,
        bus: Arc<dyn FanoutBus>,
        router: NotificationRouter,
    ) -> Self {
        Self {
            instance_id,
            repo,
            presence,
            bus,
            router,
            connections: DashMap::new(),
            room_locks: DashMap::new(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Live connections on this instance.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The repository seam, for the REST surface.
    pub fn repo(&self) -> &Arc<dyn ChatRepository> {
        &self.repo
    }

    /// Register an authenticated connection.
    ///
    /// Tags the connection with the verified identity, creates the presence
    /// entry (last-connect-wins), subscribes the user and presence topics,
    /// and broadcasts "online". Authentication itself already happened at
    /// the handshake; nothing reaches this point unverified.
    pub async fn connect(
        &self,
        claims: &Claims,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<(Session, SessionStreams), SoukError> {
        let conn_id = ConnectionId::new();
        let session = Session::new(conn_id, claims.sub, claims.role);

        self.connections.insert(
            conn_id,
            ConnectionEntry {
                user_id: claims.sub,
                role: claims.role,
                sender,
            },
        );

        let user_events = self
            .bus
            .subscribe(Topic::User(claims.sub), conn_id, claims.sub);
        let presence_events = self.bus.subscribe(Topic::Presence, conn_id, claims.sub);

        self.presence
            .set(
                claims.sub,
                Locator {
                    instance_id: self.instance_id.clone(),
                    connection_id: conn_id,
                },
            )
            .await?;

        self.bus
            .publish(&Topic::Presence, BusEvent::UserOnline { user_id: claims.sub })
            .await?;

        info!(user_id = %claims.sub, conn_id = %conn_id, role = %claims.role, "connection registered");
        Ok((
            session,
            SessionStreams {
                user_events,
                presence_events,
            },
        ))
    }

    /// Subscribe the connection to a room.
    ///
    /// Idempotent: joining a room already joined returns `None` without
    /// duplicating the subscription or re-broadcasting "joined". On a fresh
    /// join, the room's most recent message is marked read on behalf of the
    /// joiner (opening a conversation implies having seen its latest state).
    pub async fn join(
        &self,
        session: &mut Session,
        room_id: &str,
    ) -> Result<Option<broadcast::Receiver<BusEvent>>, SoukError> {
        let room_id = parse_room_id(room_id)?;
        if session.is_joined(&room_id) {
            debug!(room_id = %room_id, "join ignored; already subscribed");
            return Ok(None);
        }

        let room = self
            .repo
            .room(&room_id)
            .await?
            .ok_or_else(|| SoukError::NotFound {
                what: "room",
                id: room_id.to_string(),
            })?;
        if !room.is_member(&session.user_id) {
            return Err(SoukError::Validation(
                "not a participant in this room".to_string(),
            ));
        }

        let topic = Topic::Room(room_id);
        let receiver = self.bus.subscribe(topic.clone(), session.conn_id, session.user_id);
        session.add_room(room_id);

        self.bus
            .publish(
                &topic,
                BusEvent::UserJoinedRoom {
                    room_id,
                    user_id: session.user_id,
                },
            )
            .await?;

        // Opening the room counts as reading everything up to its latest
        // message. Only broadcast a receipt when something actually flipped.
        if let Some(latest) = self.repo.latest_message(&room_id).await? {
            let flipped = self
                .repo
                .mark_read(&room_id, &latest.id, &session.user_id)
                .await?;
            if flipped > 0 {
                self.bus
                    .publish(
                        &topic,
                        BusEvent::MessageRead {
                            room_id,
                            message_id: latest.id,
                            reader_id: session.user_id,
                        },
                    )
                    .await?;
            }
        }

        Ok(Some(receiver))
    }

    /// Unsubscribe the connection from a room. Idempotent; returns whether
    /// a subscription was actually dropped.
    pub async fn leave(&self, session: &mut Session, room_id: &str) -> Result<bool, SoukError> {
        let room_id = parse_room_id(room_id)?;
        if !session.remove_room(&room_id) {
            return Ok(false);
        }

        let topic = Topic::Room(room_id);
        self.bus.unsubscribe(&topic, &session.conn_id);
        self.bus
            .publish(
                &topic,
                BusEvent::UserLeftRoom {
                    room_id,
                    user_id: session.user_id,
                },
            )
            .await?;
        Ok(true)
    }

    /// Validate, persist, broadcast, and route a message.
    ///
    /// The persisted message (with its server-assigned timestamp) is
    /// returned for the sender's acknowledgment. Delivery routing for the
    /// other party runs before the ack so an in-room read receipt is
    /// observable no later than the ack; routing failures are logged, not
    /// surfaced; the message is already durable at that point.
    pub async fn send_message(
        &self,
        session: &Session,
        room_id: &str,
        content: &str,
    ) -> Result<ChatMessage, SoukError> {
        let room_id = parse_room_id(room_id)?;
        validate_content(content)?;

        let room = self
            .repo
            .room(&room_id)
            .await?
            .ok_or_else(|| SoukError::NotFound {
                what: "room",
                id: room_id.to_string(),
            })?;
        if !room.is_member(&session.user_id) {
            return Err(SoukError::Validation(
                "not a participant in this room".to_string(),
            ));
        }

        let lock = self
            .room_locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _sequenced = lock.lock().await;

        let message = self
            .repo
            .save_message(&room_id, &session.user_id, content)
            .await?;

        self.bus
            .publish(
                &Topic::Room(room_id),
                BusEvent::NewMessage {
                    message: message.clone(),
                },
            )
            .await?;

        if let Err(e) = self.router.route(&room, &session.user_id, &message).await {
            warn!(room_id = %room_id, error = %e, "delivery routing failed after persist");
        }

        Ok(message)
    }

    /// Point lookup against the presence registry. No side effects.
    pub async fn check_presence(&self, user_id: &str) -> Result<(UserId, bool), SoukError> {
        let user_id = UserId::from_str(user_id)
            .map_err(|_| SoukError::Validation("malformed user id".to_string()))?;
        let online = self.presence.get(&user_id).await?.is_some();
        Ok((user_id, online))
    }

    /// Tear down a connection: drop all subscriptions, clear the presence
    /// entry (only if it still points at this connection), broadcast
    /// "offline", and remove the registry entry.
    ///
    /// Already-enqueued push jobs for earlier messages are deliberately left
    /// alone; they represent messages the user is still expected to see.
    pub async fn disconnect(&self, session: &Session) {
        for room_id in session.rooms() {
            self.bus
                .unsubscribe(&Topic::Room(*room_id), &session.conn_id);
        }
        self.bus
            .unsubscribe(&Topic::User(session.user_id), &session.conn_id);
        self.bus.unsubscribe(&Topic::Presence, &session.conn_id);

        let locator = Locator {
            instance_id: self.instance_id.clone(),
            connection_id: session.conn_id,
        };
        match self.presence.remove_if(&session.user_id, &locator).await {
            Ok(removed) => {
                if !removed {
                    debug!(user_id = %session.user_id, "presence already re-owned by a newer connection");
                }
            }
            Err(e) => warn!(user_id = %session.user_id, error = %e, "presence cleanup failed"),
        }

        if let Err(e) = self
            .bus
            .publish(
                &Topic::Presence,
                BusEvent::UserOffline {
                    user_id: session.user_id,
                },
            )
            .await
        {
            warn!(error = %e, "offline broadcast failed");
        }

        self.connections.remove(&session.conn_id);
        info!(user_id = %session.user_id, conn_id = %session.conn_id, "connection closed");
    }
}

fn parse_room_id(raw: &str) -> Result<RoomId, SoukError> {
    RoomId::from_str(raw).map_err(|_| SoukError::Validation("malformed room id".to_string()))
}
