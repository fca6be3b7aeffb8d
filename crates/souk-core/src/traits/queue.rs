// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable work queue decoupling push delivery from the chat send path.

use async_trait::async_trait;

use crate::error::SoukError;
use crate::types::{OutboundNotificationJob, QueuedJob};

/// FIFO queue of push notification jobs with at-least-once consumption.
///
/// Enqueue happens on the chat path (fast, local); dequeue/ack/fail are
/// driven by the delivery worker pool. A failed job is retried until its
/// attempt budget is exhausted, then parked as permanently failed.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Enqueue a job. Returns the queue entry id.
    async fn enqueue_push(&self, job: &OutboundNotificationJob) -> Result<i64, SoukError>;

    /// Take the next pending job, marking it in-flight. `None` when empty.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, SoukError>;

    /// Acknowledge successful (or terminally dropped) processing.
    async fn ack(&self, id: i64) -> Result<(), SoukError>;

    /// Record a transient failure. The job returns to pending until its
    /// attempt budget runs out.
    async fn fail(&self, id: i64) -> Result<(), SoukError>;
}
