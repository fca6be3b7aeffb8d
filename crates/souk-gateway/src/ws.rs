// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport for the connection gateway.
//!
//! The bearer credential is verified during the handshake: an invalid or
//! missing credential refuses the connection with its reason and no events
//! are ever processed for it. After the upgrade, one task pumps outbound
//! events to the socket, small forwarder tasks pump bus subscriptions into
//! it, and the receive loop dispatches client events to the gateway core.

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use souk_core::{BusEvent, RoomId};

use crate::auth::{bearer_from_headers, verify_token, Claims};
use crate::events::{ClientEvent, ServerEvent};
use crate::server::GatewayState;

/// Outbound buffer per connection. A client that cannot drain this many
/// events gets disconnected rather than wedging the bus forwarders.
const OUTBOUND_BUFFER: usize = 64;

/// WebSocket upgrade handler.
///
/// The credential rides either the `Authorization: Bearer` header or, for
/// browser clients that cannot set WebSocket headers, the `token` query
/// parameter. Authentication completes before the upgrade: no other event
/// is accepted from an unauthenticated connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    let token = bearer_from_headers(&headers).or_else(|| params.get("token").cloned());
    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, "missing bearer credential").into_response();
    };

    match verify_token(&state.auth.secret, &token) {
        Ok(claims) => ws.on_upgrade(move |socket| handle_socket(socket, state, claims)),
        Err(e) => (StatusCode::UNAUTHORIZED, e.to_string()).into_response(),
    }
}

/// Handle one authenticated WebSocket connection end to end.
async fn handle_socket(socket: WebSocket, state: GatewayState, claims: Claims) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);

    let (mut session, streams) = match state.gateway.connect(&claims, tx.clone()).await {
        Ok(registered) => registered,
        Err(e) => {
            warn!(error = %e, "connection registration failed");
            return;
        }
    };

    // Pump outbound events to the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "failed to serialize server event");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Fixed forwarders: the user's own topic and the fleet presence topic.
    let mut fixed_forwarders = vec![
        spawn_forwarder(streams.user_events, tx.clone()),
        spawn_forwarder(streams.presence_events, tx.clone()),
    ];
    // One forwarder per joined room, keyed for teardown on leave.
    let mut room_forwarders: HashMap<RoomId, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let event: ClientEvent = match serde_json::from_str(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(error = %e, "unparseable client event");
                        let nack = ServerEvent::ack_err(&souk_core::SoukError::Validation(
                            "unrecognized event".to_string(),
                        ));
                        if tx.send(nack).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };
                if !dispatch(&state, &mut session, &mut room_forwarders, &tx, event).await {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary; ping/pong handled by the ws layer.
        }
    }

    // Teardown: presence, subscriptions, registry.
    state.gateway.disconnect(&session).await;
    for (_, handle) in room_forwarders {
        handle.abort();
    }
    for handle in fixed_forwarders.drain(..) {
        handle.abort();
    }
    sender_task.abort();
}

/// Dispatch one client event. Returns `false` when the outbound channel is
/// gone and the connection should be torn down.
async fn dispatch(
    state: &GatewayState,
    session: &mut crate::connection::Session,
    room_forwarders: &mut HashMap<RoomId, JoinHandle<()>>,
    tx: &mpsc::Sender<ServerEvent>,
    event: ClientEvent,
) -> bool {
    match event {
        ClientEvent::Join { room_id } => {
            match state.gateway.join(session, &room_id).await {
                Ok(Some(receiver)) => {
                    // join only returns a receiver for a room id it parsed.
                    if let Ok(parsed) = room_id.parse::<RoomId>() {
                        room_forwarders.insert(parsed, spawn_forwarder(receiver, tx.clone()));
                    }
                    true
                }
                Ok(None) => true, // idempotent re-join
                Err(e) => tx.send(ServerEvent::ack_err(&e)).await.is_ok(),
            }
        }
        ClientEvent::Leave { room_id } => match state.gateway.leave(session, &room_id).await {
            Ok(left) => {
                if left
                    && let Ok(parsed) = room_id.parse::<RoomId>()
                    && let Some(handle) = room_forwarders.remove(&parsed)
                {
                    handle.abort();
                }
                true
            }
            Err(e) => tx.send(ServerEvent::ack_err(&e)).await.is_ok(),
        },
        ClientEvent::Send { room_id, content } => {
            let ack = match state.gateway.send_message(session, &room_id, &content).await {
                Ok(message) => ServerEvent::ack_ok(message),
                Err(e) => ServerEvent::ack_err(&e),
            };
            tx.send(ack).await.is_ok()
        }
        ClientEvent::CheckPresence { user_id } => {
            let reply = match state.gateway.check_presence(&user_id).await {
                Ok((user_id, online)) => ServerEvent::Presence { user_id, online },
                Err(e) => ServerEvent::ack_err(&e),
            };
            tx.send(reply).await.is_ok()
        }
    }
}

/// Forward bus events into the connection's outbound channel until either
/// side goes away.
fn spawn_forwarder(
    mut rx: broadcast::Receiver<BusEvent>,
    tx: mpsc::Sender<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if tx.send(event.into()).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "slow consumer lagged behind fan-out");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
