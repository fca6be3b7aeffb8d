// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification routing and asynchronous push delivery for souk.
//!
//! The router picks one of three delivery paths per message (in-room,
//! cross-instance, push). The worker pool drains the durable push queue and
//! calls the provider client, fully isolated from the chat send path.

pub mod provider;
pub mod router;
pub mod worker;

pub use provider::HttpPushClient;
pub use router::{decide, DeliveryPlan, NotificationRouter};
pub use worker::{spawn_workers, PushWorker};
