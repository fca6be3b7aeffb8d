// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST handlers for the gateway.
//!
//! `POST /v1/rooms` bootstraps (get-or-creates) the room for a
//! customer/vendor pair; `GET /v1/rooms/{id}/messages` pages through
//! history newest-first. `GET /health` is unauthenticated.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::error;

use souk_core::{ChatMessage, ChatRoom, RoomId, SoukError, UserId};

use crate::server::GatewayState;

/// Request body for POST /v1/rooms.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub customer_id: UserId,
    pub vendor_id: UserId,
}

/// Query parameters for GET /v1/rooms/{id}/messages.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Exclusive `createdAt` upper bound; omit to start from the latest.
    #[serde(default)]
    pub before: Option<String>,
    /// Page size, clamped to 1..=100. Defaults to 50.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Response body for GET /v1/rooms/{id}/messages.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub connections: usize,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// POST /v1/rooms
///
/// Get-or-create the room for a customer/vendor pair. Safe to race: the
/// store's uniqueness constraint makes every caller land on the same room.
pub async fn create_room(
    State(state): State<GatewayState>,
    Json(body): Json<CreateRoomRequest>,
) -> Response {
    if body.customer_id == body.vendor_id {
        return error_response(&SoukError::Validation(
            "customer and vendor must differ".to_string(),
        ));
    }

    match state
        .gateway
        .repo()
        .create_or_get_room(body.customer_id, body.vendor_id)
        .await
    {
        Ok(room) => (StatusCode::OK, Json::<ChatRoom>(room)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /v1/rooms/{id}/messages
///
/// Paginated history over `(roomId, createdAt)`, newest first.
pub async fn room_history(
    State(state): State<GatewayState>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let room_id = match RoomId::from_str(&room_id) {
        Ok(id) => id,
        Err(_) => {
            return error_response(&SoukError::Validation("malformed room id".to_string()))
        }
    };

    let repo = state.gateway.repo();
    match repo.room(&room_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(&SoukError::NotFound {
                what: "room",
                id: room_id.to_string(),
            })
        }
        Err(e) => return error_response(&e),
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    match repo
        .messages_before(&room_id, query.before.as_deref(), limit)
        .await
    {
        Ok(messages) => (StatusCode::OK, Json(HistoryResponse { messages })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.gateway.instance_id().to_string(),
        connections: state.gateway.connection_count(),
    })
}

/// Map an error to its HTTP response, leaking nothing internal.
fn error_response(err: &SoukError) -> Response {
    let (status, message) = match err {
        SoukError::Validation(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        SoukError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        SoukError::Auth(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
        _ => {
            error!(error = %err, "internal failure surfaced as opaque 500");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };
    (status, Json(ErrorResponse { error: message })).into_response()
}
