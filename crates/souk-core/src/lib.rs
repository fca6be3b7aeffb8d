// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the souk chat gateway.
//!
//! Provides the error type, domain types, and the trait seams
//! (`PresenceStore`, `FanoutBus`, repository/queue/push) implemented by the
//! infrastructure crates and consumed by the gateway.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{PushError, SoukError};
pub use types::{
    validate_content, BusEvent, ChatMessage, ChatRoom, ConnectionId, Locator, MessageId,
    OutboundNotificationJob, PushPayload, QueuedJob, Role, RoomId, Topic, UserId,
};

pub use traits::{
    ChatRepository, FanoutBus, JobQueue, PresenceStore, PushSender, UserDirectory,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _auth = SoukError::Auth("missing token".into());
        let _validation = SoukError::Validation("bad room id".into());
        let _not_found = SoukError::NotFound {
            what: "room",
            id: "r".into(),
        };
        let _store = SoukError::store(std::io::Error::other("io"));
        let _fanout = SoukError::Fanout("closed".into());
        let _config = SoukError::Config("bad".into());
        let _internal = SoukError::Internal("bug".into());
    }

    #[test]
    fn trait_objects_are_usable() {
        // The gateway holds every seam as a trait object; if any trait is
        // not object-safe this stops compiling.
        fn _presence(_: std::sync::Arc<dyn PresenceStore>) {}
        fn _bus(_: std::sync::Arc<dyn FanoutBus>) {}
        fn _repo(_: std::sync::Arc<dyn ChatRepository>) {}
        fn _dir(_: std::sync::Arc<dyn UserDirectory>) {}
        fn _queue(_: std::sync::Arc<dyn JobQueue>) {}
        fn _push(_: std::sync::Arc<dyn PushSender>) {}
    }
}
