// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket connection gateway for the souk chat service.
//!
//! Accepts client connections, authenticates them against a shared secret,
//! manages room subscriptions, validates and persists messages, and routes
//! delivery for the other party. One lightweight task per connection; all
//! cross-connection state lives behind the `PresenceStore` and `FanoutBus`
//! seams so any instance can serve any connection.

pub mod auth;
pub mod connection;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::{sign_token, verify_token, AuthConfig, Claims};
pub use events::{AckStatus, ClientEvent, ServerEvent};
pub use gateway::{Gateway, SessionStreams};
pub use server::{build_router, start_server, GatewayState};
