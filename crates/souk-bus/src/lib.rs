// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process backends for the souk presence registry and fan-out bus.
//!
//! Both shared-state seams (`PresenceStore`, `FanoutBus`) are implemented
//! here over `dashmap` and `tokio::sync::broadcast`. They are the only
//! resources mutated by more than one connection task concurrently, and
//! neither takes a global lock.

pub mod fanout;
pub mod presence;

pub use fanout::InProcessBus;
pub use presence::InProcessPresence;
