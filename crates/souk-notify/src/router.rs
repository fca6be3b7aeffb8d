// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message delivery routing.
//!
//! Invoked once per send, after the message is persisted and broadcast to
//! the room. Picks among three delivery paths for the other party: in-room
//! (already receiving the room broadcast; mark read immediately),
//! cross-instance (online elsewhere; notify their socket), or async push.
//! The decision itself is the pure [`decide`] function, testable without
//! sockets or stores.

use std::sync::Arc;

use tracing::{debug, info};

use souk_core::{
    BusEvent, ChatMessage, ChatRepository, ChatRoom, FanoutBus, JobQueue,
    OutboundNotificationJob, PresenceStore, SoukError, Topic, UserDirectory, UserId,
};

/// How a message reaches its receiver. `StoreOnly` is the terminal,
/// non-error outcome for an offline receiver with no push token: the
/// message is persisted and nothing more is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryPlan {
    /// Receiver is subscribed to the room somewhere in the fleet; the room
    /// broadcast already delivered the message. Mark it read and broadcast
    /// the read receipt.
    InRoom,
    /// Receiver is online but not viewing this room; deliver a notification
    /// event to their connection, unread.
    CrossInstance,
    /// Receiver is offline with a push token on file; enqueue a push job.
    Push { token: String },
    /// Receiver is offline with no token; persistence is the end of the line.
    StoreOnly,
}

/// The three-tier fallback, as a pure function of the receiver's state.
///
/// Room presence wins over global presence: a user can be online globally
/// but not currently viewing this room.
pub fn decide(in_room: bool, online: bool, push_token: Option<String>) -> DeliveryPlan {
    if in_room {
        DeliveryPlan::InRoom
    } else if online {
        DeliveryPlan::CrossInstance
    } else if let Some(token) = push_token {
        DeliveryPlan::Push { token }
    } else {
        DeliveryPlan::StoreOnly
    }
}

/// Executes delivery plans against the shared infrastructure.
pub struct NotificationRouter {
    presence: Arc<dyn PresenceStore>,
    bus: Arc<dyn FanoutBus>,
    directory: Arc<dyn UserDirectory>,
    queue: Arc<dyn JobQueue>,
    repo: Arc<dyn ChatRepository>,
}

impl NotificationRouter {
    pub fn new(
        presence: Arc<dyn PresenceStore>,
        bus: Arc<dyn FanoutBus>,
        directory: Arc<dyn UserDirectory>,
        queue: Arc<dyn JobQueue>,
        repo: Arc<dyn ChatRepository>,
    ) -> Self {
        Self {
            presence,
            bus,
            directory,
            queue,
            repo,
        }
    }

    /// Route a freshly persisted message to the other party of the room.
    ///
    /// Returns the executed plan. Failures here are internal: the message is
    /// already persisted and broadcast, so callers log and move on rather
    /// than failing the sender's ack.
    pub async fn route(
        &self,
        room: &ChatRoom,
        sender_id: &UserId,
        message: &ChatMessage,
    ) -> Result<DeliveryPlan, SoukError> {
        let receiver = room.other_party(sender_id).ok_or_else(|| {
            SoukError::Validation("sender is not a participant in this room".to_string())
        })?;

        // Room membership comes from the fan-out bus, not the global
        // presence registry: online-somewhere is not in-this-room.
        let room_topic = Topic::Room(room.id);
        let in_room = self.bus.members(&room_topic).await?.contains(&receiver);
        let online = self.presence.get(&receiver).await?.is_some();
        let push_token = self.directory.push_token_of(&receiver).await?;

        let plan = decide(in_room, online, push_token);
        match &plan {
            DeliveryPlan::InRoom => {
                // TODO: detecting the receiver as in-room here can race a
                // join/leave against rapid sends, leaving the unread count
                // off by the in-flight messages. Needs an ordering story
                // between membership changes and mark-read.
                self.repo.mark_read(&room.id, &message.id, &receiver).await?;
                self.bus
                    .publish(
                        &room_topic,
                        BusEvent::MessageRead {
                            room_id: room.id,
                            message_id: message.id,
                            reader_id: receiver,
                        },
                    )
                    .await?;
            }
            DeliveryPlan::CrossInstance => {
                self.bus
                    .publish(
                        &Topic::User(receiver),
                        BusEvent::ChatNotification {
                            room_id: room.id,
                            message: message.clone(),
                        },
                    )
                    .await?;
            }
            DeliveryPlan::Push { token } => {
                let job = OutboundNotificationJob::for_message(token.clone(), message);
                let job_id = self.queue.enqueue_push(&job).await?;
                info!(job_id, room_id = %room.id, "push job enqueued for offline receiver");
            }
            DeliveryPlan::StoreOnly => {
                debug!(room_id = %room.id, "receiver offline with no push token; message stored only");
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use souk_bus::{InProcessBus, InProcessPresence};
    use souk_core::{ConnectionId, Locator, MessageId, QueuedJob, RoomId};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn plan_token(t: &str) -> DeliveryPlan {
        DeliveryPlan::Push {
            token: t.to_string(),
        }
    }

    #[test]
    fn decide_prefers_room_over_global_presence() {
        assert_eq!(decide(true, true, Some("t".into())), DeliveryPlan::InRoom);
        assert_eq!(decide(true, false, None), DeliveryPlan::InRoom);
        assert_eq!(
            decide(false, true, Some("t".into())),
            DeliveryPlan::CrossInstance
        );
        assert_eq!(decide(false, false, Some("t".into())), plan_token("t"));
        assert_eq!(decide(false, false, None), DeliveryPlan::StoreOnly);
    }

    // --- fixtures over the real in-process backends plus recording mocks ---

    #[derive(Default)]
    struct RecordingRepo {
        read_marks: Mutex<Vec<(RoomId, MessageId, UserId)>>,
    }

    #[async_trait]
    impl ChatRepository for RecordingRepo {
        async fn create_or_get_room(
            &self,
            _customer_id: UserId,
            _vendor_id: UserId,
        ) -> Result<ChatRoom, SoukError> {
            unreachable!("not used by the router")
        }

        async fn room(&self, _id: &RoomId) -> Result<Option<ChatRoom>, SoukError> {
            Ok(None)
        }

        async fn save_message(
            &self,
            _room_id: &RoomId,
            _sender_id: &UserId,
            _content: &str,
        ) -> Result<ChatMessage, SoukError> {
            unreachable!("not used by the router")
        }

        async fn mark_read(
            &self,
            room_id: &RoomId,
            upto: &MessageId,
            reader_id: &UserId,
        ) -> Result<u64, SoukError> {
            self.read_marks
                .lock()
                .unwrap()
                .push((*room_id, *upto, *reader_id));
            Ok(1)
        }

        async fn latest_message(
            &self,
            _room_id: &RoomId,
        ) -> Result<Option<ChatMessage>, SoukError> {
            Ok(None)
        }

        async fn messages_before(
            &self,
            _room_id: &RoomId,
            _before: Option<&str>,
            _limit: i64,
        ) -> Result<Vec<ChatMessage>, SoukError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MapDirectory {
        tokens: HashMap<UserId, String>,
    }

    #[async_trait]
    impl UserDirectory for MapDirectory {
        async fn push_token_of(&self, user: &UserId) -> Result<Option<String>, SoukError> {
            Ok(self.tokens.get(user).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingQueue {
        jobs: Mutex<Vec<OutboundNotificationJob>>,
    }

    #[async_trait]
    impl JobQueue for RecordingQueue {
        async fn enqueue_push(&self, job: &OutboundNotificationJob) -> Result<i64, SoukError> {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.push(job.clone());
            Ok(jobs.len() as i64)
        }

        async fn dequeue(&self) -> Result<Option<QueuedJob>, SoukError> {
            Ok(None)
        }

        async fn ack(&self, _id: i64) -> Result<(), SoukError> {
            Ok(())
        }

        async fn fail(&self, _id: i64) -> Result<(), SoukError> {
            Ok(())
        }
    }

    struct Fixture {
        presence: Arc<InProcessPresence>,
        bus: Arc<InProcessBus>,
        directory: Arc<MapDirectory>,
        queue: Arc<RecordingQueue>,
        repo: Arc<RecordingRepo>,
        room: ChatRoom,
    }

    impl Fixture {
        fn new(tokens: HashMap<UserId, String>) -> Self {
            Self {
                presence: Arc::new(InProcessPresence::new()),
                bus: Arc::new(InProcessBus::new()),
                directory: Arc::new(MapDirectory { tokens }),
                queue: Arc::new(RecordingQueue::default()),
                repo: Arc::new(RecordingRepo::default()),
                room: ChatRoom {
                    id: RoomId::new(),
                    customer_id: UserId::new(),
                    vendor_id: UserId::new(),
                    created_at: "2026-01-01T00:00:00.000Z".to_string(),
                },
            }
        }

        fn router(&self) -> NotificationRouter {
            NotificationRouter::new(
                self.presence.clone(),
                self.bus.clone(),
                self.directory.clone(),
                self.queue.clone(),
                self.repo.clone(),
            )
        }

        fn message_from_customer(&self, content: &str) -> ChatMessage {
            ChatMessage {
                id: MessageId::new(),
                room_id: self.room.id,
                sender_id: self.room.customer_id,
                content: content.to_string(),
                created_at: "2026-01-01T00:00:01.000Z".to_string(),
                is_read: false,
            }
        }
    }

    #[tokio::test]
    async fn receiver_in_room_gets_read_receipt_and_no_push() {
        let fixture = Fixture::new(HashMap::new());
        let vendor = fixture.room.vendor_id;
        let room_topic = Topic::Room(fixture.room.id);

        // Vendor is subscribed to the room on some instance.
        let mut room_rx = fixture
            .bus
            .subscribe(room_topic.clone(), ConnectionId::new(), vendor);

        let msg = fixture.message_from_customer("Hi");
        let plan = fixture
            .router()
            .route(&fixture.room, &fixture.room.customer_id, &msg)
            .await
            .unwrap();

        assert_eq!(plan, DeliveryPlan::InRoom);
        assert_eq!(
            fixture.repo.read_marks.lock().unwrap().as_slice(),
            &[(fixture.room.id, msg.id, vendor)]
        );
        assert_eq!(
            room_rx.recv().await.unwrap(),
            BusEvent::MessageRead {
                room_id: fixture.room.id,
                message_id: msg.id,
                reader_id: vendor,
            }
        );
        assert!(fixture.queue.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn receiver_online_elsewhere_gets_cross_instance_notification() {
        let fixture = Fixture::new(HashMap::new());
        let vendor = fixture.room.vendor_id;
        let conn = ConnectionId::new();

        // Vendor online globally but not subscribed to this room.
        fixture
            .presence
            .set(
                vendor,
                Locator {
                    instance_id: "souk-b".to_string(),
                    connection_id: conn,
                },
            )
            .await
            .unwrap();
        let mut user_rx = fixture.bus.subscribe(Topic::User(vendor), conn, vendor);

        let msg = fixture.message_from_customer("Hi");
        let plan = fixture
            .router()
            .route(&fixture.room, &fixture.room.customer_id, &msg)
            .await
            .unwrap();

        assert_eq!(plan, DeliveryPlan::CrossInstance);
        assert_eq!(
            user_rx.recv().await.unwrap(),
            BusEvent::ChatNotification {
                room_id: fixture.room.id,
                message: msg,
            }
        );
        // Not marked read on this path.
        assert!(fixture.repo.read_marks.lock().unwrap().is_empty());
        assert!(fixture.queue.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_receiver_with_token_gets_exactly_one_job() {
        let mut tokens = HashMap::new();
        let fixture = {
            let f = Fixture::new(HashMap::new());
            tokens.insert(f.room.vendor_id, "tok-T".to_string());
            Fixture {
                directory: Arc::new(MapDirectory { tokens }),
                ..f
            }
        };

        let msg = fixture.message_from_customer("Hello");
        let plan = fixture
            .router()
            .route(&fixture.room, &fixture.room.customer_id, &msg)
            .await
            .unwrap();

        assert_eq!(plan, plan_token("tok-T"));
        let jobs = fixture.queue.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].token, "tok-T");
        assert_eq!(jobs[0].title, "New Message");
        assert_eq!(jobs[0].body, "Hello");
        assert_eq!(jobs[0].payload.room_id, fixture.room.id);
    }

    #[tokio::test]
    async fn offline_receiver_without_token_is_terminal_success() {
        let fixture = Fixture::new(HashMap::new());

        let msg = fixture.message_from_customer("Hello");
        let plan = fixture
            .router()
            .route(&fixture.room, &fixture.room.customer_id, &msg)
            .await
            .unwrap();

        assert_eq!(plan, DeliveryPlan::StoreOnly);
        assert!(fixture.queue.jobs.lock().unwrap().is_empty());
        assert!(fixture.repo.read_marks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_member_sender_is_rejected() {
        let fixture = Fixture::new(HashMap::new());
        let msg = fixture.message_from_customer("Hi");
        let outsider = UserId::new();

        let err = fixture
            .router()
            .route(&fixture.room, &outsider, &msg)
            .await
            .unwrap_err();
        assert!(matches!(err, SoukError::Validation(_)));
    }
}
