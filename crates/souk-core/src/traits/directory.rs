// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrow user-directory lookup consumed by the notification router.

use async_trait::async_trait;

use crate::error::SoukError;
use crate::types::UserId;

/// The only thing the chat path needs from the wider user system: which
/// push token, if any, is registered for a user.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    async fn push_token_of(&self, user: &UserId) -> Result<Option<String>, SoukError>;
}
