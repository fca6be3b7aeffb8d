// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over a real WebSocket connection.
//!
//! Each test boots the full gateway router on an ephemeral port with temp
//! SQLite and the in-process bus/presence backends, then drives it with a
//! tokio-tungstenite client exactly as a production client would.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use souk_bus::{InProcessBus, InProcessPresence};
use souk_config::model::StorageConfig;
use souk_core::{
    ChatRepository, ChatRoom, FanoutBus, JobQueue, PresenceStore, Role, UserDirectory, UserId,
};
use souk_gateway::{build_router, sign_token, AuthConfig, Claims, Gateway, GatewayState};
use souk_notify::NotificationRouter;
use souk_storage::SqliteStore;

const SECRET: &str = "e2e-shared-secret-0123456789abcdef";

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct E2eHarness {
    store: Arc<SqliteStore>,
    addr: SocketAddr,
    _dir: tempfile::TempDir,
}

impl E2eHarness {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("e2e.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(&config).await.unwrap());
        let presence: Arc<dyn PresenceStore> = Arc::new(InProcessPresence::new());
        let bus: Arc<dyn FanoutBus> = Arc::new(InProcessBus::new());

        let router = NotificationRouter::new(
            presence.clone(),
            bus.clone(),
            store.clone() as Arc<dyn UserDirectory>,
            store.clone() as Arc<dyn JobQueue>,
            store.clone() as Arc<dyn ChatRepository>,
        );
        let gateway = Arc::new(Gateway::new(
            "souk-e2e".to_string(),
            store.clone() as Arc<dyn ChatRepository>,
            presence,
            bus,
            router,
        ));

        let state = GatewayState {
            gateway,
            auth: AuthConfig {
                secret: SECRET.to_string(),
            },
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, build_router(state)).into_future());

        Self {
            store,
            addr,
            _dir: dir,
        }
    }

    fn token_for(&self, user: UserId, role: Role) -> String {
        sign_token(SECRET, &Claims::new(user, role, 3600))
    }

    async fn ws(&self, user: UserId, role: Role) -> Ws {
        let url = format!(
            "ws://{}/ws?token={}",
            self.addr,
            self.token_for(user, role)
        );
        let (stream, _response) = connect_async(url).await.expect("ws handshake");
        stream
    }

    async fn room(&self, customer: UserId, vendor: UserId) -> ChatRoom {
        self.store.create_or_get_room(customer, vendor).await.unwrap()
    }
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("ws send");
}

async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server event")
            .expect("ws stream ended")
            .expect("ws error");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

/// Read events until one matches the wanted `type`, returning it.
async fn read_until(ws: &mut Ws, wanted: &str) -> Value {
    for _ in 0..50 {
        let event = next_json(ws).await;
        if event["type"] == wanted {
            return event;
        }
    }
    panic!("never saw a {wanted} event");
}

#[tokio::test]
async fn handshake_without_credential_is_refused() {
    let harness = E2eHarness::start().await;
    let url = format!("ws://{}/ws", harness.addr);

    let err = connect_async(url).await.expect_err("must refuse");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP 401 refusal, got {other:?}"),
    }
}

#[tokio::test]
async fn handshake_with_expired_credential_is_refused() {
    let harness = E2eHarness::start().await;
    let stale = sign_token(SECRET, &Claims::new(UserId::new(), Role::Customer, -60));
    let url = format!("ws://{}/ws?token={stale}", harness.addr);

    let err = connect_async(url).await.expect_err("must refuse");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP 401 refusal, got {other:?}"),
    }
}

#[tokio::test]
async fn join_send_ack_round_trip_over_the_wire() {
    let harness = E2eHarness::start().await;
    let customer = UserId::new();
    let vendor = UserId::new();
    let room = harness.room(customer, vendor).await;

    let mut ws = harness.ws(customer, Role::Customer).await;

    send_json(&mut ws, json!({"type": "join", "roomId": room.id.to_string()})).await;
    let joined = read_until(&mut ws, "userJoinedRoom").await;
    assert_eq!(joined["roomId"], json!(room.id));
    assert_eq!(joined["userId"], json!(customer));

    send_json(
        &mut ws,
        json!({"type": "send", "roomId": room.id.to_string(), "content": "Hello"}),
    )
    .await;

    let ack = read_until(&mut ws, "ack").await;
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["message"]["content"], "Hello");
    assert_eq!(ack["message"]["isRead"], false);
    assert!(ack["message"]["createdAt"].is_string());

    // The sender is subscribed to the room, so the broadcast reaches it too.
    // (newMessage may arrive before or after the ack; scan from the start.)
    let mut ws2 = harness.ws(vendor, Role::Vendor).await;
    send_json(&mut ws2, json!({"type": "join", "roomId": room.id.to_string()})).await;
    send_json(
        &mut ws2,
        json!({"type": "send", "roomId": room.id.to_string(), "content": "Hi back"}),
    )
    .await;
    let broadcast = read_until(&mut ws, "newMessage").await;
    assert!(broadcast["message"]["content"].is_string());
}

#[tokio::test]
async fn validation_failures_surface_via_ack_and_connection_survives() {
    let harness = E2eHarness::start().await;
    let customer = UserId::new();
    let vendor = UserId::new();
    let room = harness.room(customer, vendor).await;

    let mut ws = harness.ws(customer, Role::Customer).await;

    send_json(&mut ws, json!({"type": "join", "roomId": "not-a-room"})).await;
    let nack = read_until(&mut ws, "ack").await;
    assert_eq!(nack["status"], "error");
    assert!(nack["reason"].as_str().unwrap().contains("malformed room id"));

    // Connection still works after the rejected event.
    send_json(&mut ws, json!({"type": "join", "roomId": room.id.to_string()})).await;
    send_json(
        &mut ws,
        json!({"type": "send", "roomId": room.id.to_string(), "content": "still alive"}),
    )
    .await;
    let ack = read_until(&mut ws, "ack").await;
    assert_eq!(ack["status"], "ok");
}

#[tokio::test]
async fn check_presence_reflects_live_connections() {
    let harness = E2eHarness::start().await;
    let customer = UserId::new();
    let vendor = UserId::new();

    let mut ws = harness.ws(customer, Role::Customer).await;

    send_json(
        &mut ws,
        json!({"type": "checkPresence", "userId": vendor.to_string()}),
    )
    .await;
    let offline = read_until(&mut ws, "presence").await;
    assert_eq!(offline["online"], false);

    let _ws_vendor = harness.ws(vendor, Role::Vendor).await;
    send_json(
        &mut ws,
        json!({"type": "checkPresence", "userId": vendor.to_string()}),
    )
    .await;
    let online = read_until(&mut ws, "presence").await;
    assert_eq!(online["userId"], json!(vendor));
    assert_eq!(online["online"], true);
}

#[tokio::test]
async fn offline_receiver_with_token_gets_a_queued_push_job() {
    let harness = E2eHarness::start().await;
    let customer = UserId::new();
    let vendor = UserId::new();
    let room = harness.room(customer, vendor).await;
    harness
        .store
        .upsert_push_token(&vendor, Some("device-token-T"))
        .await
        .unwrap();

    let mut ws = harness.ws(customer, Role::Customer).await;
    send_json(&mut ws, json!({"type": "join", "roomId": room.id.to_string()})).await;
    send_json(
        &mut ws,
        json!({"type": "send", "roomId": room.id.to_string(), "content": "Hello"}),
    )
    .await;
    let ack = read_until(&mut ws, "ack").await;
    assert_eq!(ack["status"], "ok");

    // The ack implies the route already ran; the job is durable by now.
    assert_eq!(harness.store.pending_push_jobs().await.unwrap(), 1);
    let entry = harness.store.dequeue().await.unwrap().unwrap();
    assert_eq!(entry.job.token, "device-token-T");
    assert_eq!(entry.job.body, "Hello");
}
