// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push-provider client trait.

use async_trait::async_trait;

use crate::error::PushError;
use crate::types::OutboundNotificationJob;

/// Delivers a single push notification to the external provider.
///
/// Implementations classify failures: [`PushError::Rejected`] means the
/// token or payload is bad and the job should be dropped;
/// [`PushError::Transient`] means the worker may retry.
#[async_trait]
pub trait PushSender: Send + Sync + 'static {
    async fn send(&self, job: &OutboundNotificationJob) -> Result<(), PushError>;
}
