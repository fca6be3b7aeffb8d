// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP/WebSocket server built on axum.
//!
//! Routes:
//! - `GET /health` (unauthenticated)
//! - `POST /v1/rooms`, `GET /v1/rooms/{id}/messages` (bearer auth)
//! - `GET /ws` (auth during the WebSocket handshake, not middleware)

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use souk_core::SoukError;

use crate::auth::{auth_middleware, AuthConfig};
use crate::gateway::Gateway;
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<Gateway>,
    pub auth: AuthConfig,
}

/// Build the full gateway router. Split from [`start_server`] so tests can
/// serve it on an ephemeral listener.
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/rooms", post(handlers::create_room))
        .route("/v1/rooms/{id}/messages", get(handlers::room_history))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the cancellation token fires.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SoukError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SoukError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| SoukError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
