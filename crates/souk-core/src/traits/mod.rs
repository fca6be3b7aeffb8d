// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the gateway and its backing infrastructure.
//!
//! The gateway only ever talks to `PresenceStore`, `FanoutBus`, and the
//! repository/queue traits, so each can be re-backed by different shared
//! infrastructure (e.g. a networked store instead of the in-process
//! backends) without touching gateway logic.

pub mod directory;
pub mod fanout;
pub mod presence;
pub mod push;
pub mod queue;
pub mod repository;

pub use directory::UserDirectory;
pub use fanout::FanoutBus;
pub use presence::PresenceStore;
pub use push::PushSender;
pub use queue::JobQueue;
pub use repository::ChatRepository;
