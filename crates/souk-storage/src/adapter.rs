// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the repository, directory, and queue traits.

use async_trait::async_trait;
use tracing::debug;

use souk_config::model::StorageConfig;
use souk_core::{
    ChatMessage, ChatRepository, ChatRoom, JobQueue, MessageId, OutboundNotificationJob,
    QueuedJob, RoomId, SoukError, UserDirectory, UserId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store for rooms, messages, the user-directory slice, and
/// the push queue.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules. Cheap to clone; every clone shares the single writer.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store at the configured path, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, SoukError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "sqlite store opened");
        Ok(Self { db })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Register (or clear) a user's push token. Operational seeding hook;
    /// the chat path itself only reads tokens.
    pub async fn upsert_push_token(
        &self,
        user_id: &UserId,
        token: Option<&str>,
    ) -> Result<(), SoukError> {
        queries::users::upsert_push_token(&self.db, user_id, token).await
    }

    /// Jobs currently awaiting delivery. Exposed for the health endpoint.
    pub async fn pending_push_jobs(&self) -> Result<i64, SoukError> {
        queries::queue::count_with_status(&self.db, "pending").await
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), SoukError> {
        self.db.close().await
    }
}

#[async_trait]
impl ChatRepository for SqliteStore {
    async fn create_or_get_room(
        &self,
        customer_id: UserId,
        vendor_id: UserId,
    ) -> Result<ChatRoom, SoukError> {
        queries::rooms::create_or_get_room(&self.db, customer_id, vendor_id).await
    }

    async fn room(&self, id: &RoomId) -> Result<Option<ChatRoom>, SoukError> {
        queries::rooms::room(&self.db, id).await
    }

    async fn save_message(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        content: &str,
    ) -> Result<ChatMessage, SoukError> {
        queries::messages::save_message(&self.db, room_id, sender_id, content).await
    }

    async fn mark_read(
        &self,
        room_id: &RoomId,
        upto: &MessageId,
        reader_id: &UserId,
    ) -> Result<u64, SoukError> {
        queries::messages::mark_read(&self.db, room_id, upto, reader_id).await
    }

    async fn latest_message(&self, room_id: &RoomId) -> Result<Option<ChatMessage>, SoukError> {
        queries::messages::latest_message(&self.db, room_id).await
    }

    async fn messages_before(
        &self,
        room_id: &RoomId,
        before: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, SoukError> {
        queries::messages::messages_before(&self.db, room_id, before, limit).await
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn push_token_of(&self, user: &UserId) -> Result<Option<String>, SoukError> {
        queries::users::push_token_of(&self.db, user).await
    }
}

#[async_trait]
impl JobQueue for SqliteStore {
    async fn enqueue_push(&self, job: &OutboundNotificationJob) -> Result<i64, SoukError> {
        queries::queue::enqueue(&self.db, job).await
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, SoukError> {
        queries::queue::dequeue(&self.db).await
    }

    async fn ack(&self, id: i64) -> Result<(), SoukError> {
        queries::queue::ack(&self.db, id).await
    }

    async fn fail(&self, id: i64) -> Result<(), SoukError> {
        queries::queue::fail(&self.db, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("adapter.db");
        let store = SqliteStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn full_chat_lifecycle_through_traits() {
        let (store, _dir) = open_store().await;
        let customer = UserId::new();
        let vendor = UserId::new();

        let room = store.create_or_get_room(customer, vendor).await.unwrap();
        assert!(store.room(&room.id).await.unwrap().is_some());

        let msg = store
            .save_message(&room.id, &customer, "hello vendor")
            .await
            .unwrap();
        assert_eq!(
            store.latest_message(&room.id).await.unwrap().unwrap().id,
            msg.id
        );

        let flipped = store.mark_read(&room.id, &msg.id, &vendor).await.unwrap();
        assert_eq!(flipped, 1);

        let history = store.messages_before(&room.id, None, 50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_read);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn directory_and_queue_through_traits() {
        let (store, _dir) = open_store().await;
        let vendor = UserId::new();

        assert!(store.push_token_of(&vendor).await.unwrap().is_none());
        store.upsert_push_token(&vendor, Some("tok-9")).await.unwrap();
        assert_eq!(
            store.push_token_of(&vendor).await.unwrap().as_deref(),
            Some("tok-9")
        );

        let msg = ChatMessage {
            id: MessageId::new(),
            room_id: RoomId::new(),
            sender_id: UserId::new(),
            content: "ping".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            is_read: false,
        };
        let job = OutboundNotificationJob::for_message("tok-9".to_string(), &msg);

        let id = store.enqueue_push(&job).await.unwrap();
        assert_eq!(store.pending_push_jobs().await.unwrap(), 1);

        let entry = store.dequeue().await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.job, job);

        store.ack(id).await.unwrap();
        assert_eq!(store.pending_push_jobs().await.unwrap(), 0);

        store.close().await.unwrap();
    }
}
