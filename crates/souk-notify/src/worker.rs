// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push delivery worker pool.
//!
//! Workers drain the durable queue and call the push provider. Nothing on
//! this path ever raises back into the chat send path: by the time a job
//! exists, the sender already has its ack.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use souk_core::{JobQueue, PushError, PushSender, QueuedJob};

/// A single queue-draining worker.
pub struct PushWorker {
    queue: Arc<dyn JobQueue>,
    provider: Arc<dyn PushSender>,
    poll_interval: Duration,
}

impl PushWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        provider: Arc<dyn PushSender>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            provider,
            poll_interval,
        }
    }

    /// Drain the queue until cancelled. Sleeps `poll_interval` when empty.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                info!("push worker shutting down");
                break;
            }

            match self.queue.dequeue().await {
                Ok(Some(entry)) => self.process(entry).await,
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "push queue dequeue failed");
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
    }

    async fn process(&self, entry: QueuedJob) {
        match self.provider.send(&entry.job).await {
            Ok(()) => {
                debug!(job_id = entry.id, "push delivered");
                if let Err(e) = self.queue.ack(entry.id).await {
                    error!(job_id = entry.id, error = %e, "failed to ack delivered push job");
                }
            }
            Err(PushError::Rejected(reason)) => {
                // Bad token or payload: retrying cannot help, drop the job.
                warn!(job_id = entry.id, reason = %reason, "push rejected; dropping job");
                if let Err(e) = self.queue.ack(entry.id).await {
                    error!(job_id = entry.id, error = %e, "failed to drop rejected push job");
                }
            }
            Err(PushError::Transient(reason)) => {
                warn!(
                    job_id = entry.id,
                    attempts = entry.attempts,
                    reason = %reason,
                    "push delivery failed; will retry"
                );
                if let Err(e) = self.queue.fail(entry.id).await {
                    error!(job_id = entry.id, error = %e, "failed to record push failure");
                }
            }
        }
    }
}

/// Spawn `count` workers sharing the queue and provider. Returns their join
/// handles; they exit when `cancel` fires.
pub fn spawn_workers(
    count: usize,
    queue: Arc<dyn JobQueue>,
    provider: Arc<dyn PushSender>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|i| {
            let worker = PushWorker::new(queue.clone(), provider.clone(), poll_interval);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                debug!(worker = i, "push worker started");
                worker.run(cancel).await;
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use souk_core::{
        ChatMessage, MessageId, OutboundNotificationJob, RoomId, SoukError, UserId,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn make_job(body: &str) -> OutboundNotificationJob {
        let msg = ChatMessage {
            id: MessageId::new(),
            room_id: RoomId::new(),
            sender_id: UserId::new(),
            content: body.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            is_read: false,
        };
        OutboundNotificationJob::for_message("tok".to_string(), &msg)
    }

    /// In-memory queue with the same ack/fail contract as the durable one.
    #[derive(Default)]
    struct MemoryQueue {
        pending: Mutex<VecDeque<QueuedJob>>,
        acked: Mutex<Vec<i64>>,
        failed: Mutex<Vec<i64>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl JobQueue for MemoryQueue {
        async fn enqueue_push(&self, job: &OutboundNotificationJob) -> Result<i64, SoukError> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            self.pending.lock().unwrap().push_back(QueuedJob {
                id: *next,
                job: job.clone(),
                attempts: 0,
            });
            Ok(*next)
        }

        async fn dequeue(&self) -> Result<Option<QueuedJob>, SoukError> {
            Ok(self.pending.lock().unwrap().pop_front())
        }

        async fn ack(&self, id: i64) -> Result<(), SoukError> {
            self.acked.lock().unwrap().push(id);
            Ok(())
        }

        async fn fail(&self, id: i64) -> Result<(), SoukError> {
            self.failed.lock().unwrap().push(id);
            Ok(())
        }
    }

    /// Provider that plays back a scripted sequence of outcomes.
    struct ScriptedProvider {
        outcomes: Mutex<VecDeque<Result<(), PushError>>>,
        sent: Mutex<Vec<OutboundNotificationJob>>,
    }

    impl ScriptedProvider {
        fn new(outcomes: Vec<Result<(), PushError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PushSender for ScriptedProvider {
        async fn send(&self, job: &OutboundNotificationJob) -> Result<(), PushError> {
            self.sent.lock().unwrap().push(job.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }

    async fn drain_one(queue: &Arc<MemoryQueue>, provider: Arc<ScriptedProvider>) {
        let worker = PushWorker::new(
            queue.clone() as Arc<dyn JobQueue>,
            provider as Arc<dyn PushSender>,
            Duration::from_millis(5),
        );
        let entry = queue.dequeue().await.unwrap().unwrap();
        worker.process(entry).await;
    }

    #[tokio::test]
    async fn successful_delivery_acks_the_job() {
        let queue = Arc::new(MemoryQueue::default());
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(())]));

        let id = queue.enqueue_push(&make_job("hi")).await.unwrap();
        drain_one(&queue, provider.clone()).await;

        assert_eq!(queue.acked.lock().unwrap().as_slice(), &[id]);
        assert!(queue.failed.lock().unwrap().is_empty());
        assert_eq!(provider.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_delivery_is_dropped_not_retried() {
        let queue = Arc::new(MemoryQueue::default());
        let provider = Arc::new(ScriptedProvider::new(vec![Err(PushError::Rejected(
            "unregistered token".to_string(),
        ))]));

        let id = queue.enqueue_push(&make_job("hi")).await.unwrap();
        drain_one(&queue, provider).await;

        // Dropped == acked away; never marked for retry.
        assert_eq!(queue.acked.lock().unwrap().as_slice(), &[id]);
        assert!(queue.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_failure_marks_job_for_retry() {
        let queue = Arc::new(MemoryQueue::default());
        let provider = Arc::new(ScriptedProvider::new(vec![Err(PushError::Transient(
            "503".to_string(),
        ))]));

        let id = queue.enqueue_push(&make_job("hi")).await.unwrap();
        drain_one(&queue, provider).await;

        assert!(queue.acked.lock().unwrap().is_empty());
        assert_eq!(queue.failed.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn run_drains_queue_and_stops_on_cancel() {
        let queue = Arc::new(MemoryQueue::default());
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(()), Ok(()), Ok(())]));

        for i in 0..3 {
            queue.enqueue_push(&make_job(&format!("m{i}"))).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let handles = spawn_workers(
            2,
            queue.clone() as Arc<dyn JobQueue>,
            provider.clone() as Arc<dyn PushSender>,
            Duration::from_millis(5),
            cancel.clone(),
        );

        // Wait for all three jobs to be acked.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if queue.acked.lock().unwrap().len() == 3 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("workers should drain the queue");

        cancel.cancel();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("worker should stop on cancel")
                .unwrap();
        }
    }
}
