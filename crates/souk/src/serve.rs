// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `souk serve` command implementation.
//!
//! Wires the SQLite store, in-process presence and fan-out backends, the
//! notification router, the push worker pool, and the gateway server, then
//! serves until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use souk_bus::{InProcessBus, InProcessPresence};
use souk_config::SoukConfig;
use souk_core::{
    ChatRepository, FanoutBus, JobQueue, PresenceStore, PushSender, SoukError, UserDirectory,
};
use souk_gateway::{start_server, AuthConfig, Gateway, GatewayState};
use souk_notify::{spawn_workers, HttpPushClient, NotificationRouter};
use souk_storage::SqliteStore;

/// Runs the `souk serve` command.
pub async fn run_serve(config: SoukConfig) -> Result<(), SoukError> {
    init_tracing(&config.service.log_level);

    info!(instance_id = %config.service.instance_id, "starting souk serve");

    // Fail-closed: refuse to serve with no authentication configured.
    let Some(secret) = config.gateway.auth_secret.clone() else {
        return Err(SoukError::Config(
            "no authentication configured; set gateway.auth_secret (connections \
             would be unverifiable)"
                .to_string(),
        ));
    };

    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    info!(path = %config.storage.database_path, "storage ready");

    let presence: Arc<dyn PresenceStore> = Arc::new(InProcessPresence::new());
    let bus: Arc<dyn FanoutBus> = Arc::new(InProcessBus::new());

    let router = NotificationRouter::new(
        presence.clone(),
        bus.clone(),
        store.clone() as Arc<dyn UserDirectory>,
        store.clone() as Arc<dyn JobQueue>,
        store.clone() as Arc<dyn ChatRepository>,
    );
    let gateway = Arc::new(Gateway::new(
        config.service.instance_id.clone(),
        store.clone() as Arc<dyn ChatRepository>,
        presence,
        bus,
        router,
    ));

    let cancel = install_signal_handler();

    // Push delivery workers, if a provider endpoint is configured.
    let worker_handles = match config.push.endpoint.clone() {
        Some(endpoint) => {
            let provider: Arc<dyn PushSender> =
                Arc::new(HttpPushClient::new(endpoint, config.push.api_key.clone())?);
            let handles = spawn_workers(
                config.push.workers,
                store.clone() as Arc<dyn JobQueue>,
                provider,
                Duration::from_millis(config.push.poll_interval_ms),
                cancel.clone(),
            );
            info!(workers = config.push.workers, "push delivery workers started");
            handles
        }
        None => {
            warn!("push.endpoint not configured; offline recipients get no push notifications");
            Vec::new()
        }
    };

    let state = GatewayState {
        gateway,
        auth: AuthConfig { secret },
    };
    start_server(
        &config.gateway.host,
        config.gateway.port,
        state,
        cancel.clone(),
    )
    .await?;

    // The server only returns once shutdown began; drain the workers too.
    cancel.cancel();
    for handle in worker_handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "push worker ended abnormally");
        }
    }
    store.close().await?;

    info!("souk serve shutdown complete");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("souk={log_level},warn")));

    // try_init: harmless if a subscriber is already installed (tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serve_refuses_to_start_without_auth_secret() {
        let mut config = SoukConfig::default();
        config.gateway.auth_secret = None;
        let err = run_serve(config).await.unwrap_err();
        assert!(matches!(err, SoukError::Config(_)));
        assert!(err.to_string().contains("auth_secret"));
    }

    #[tokio::test]
    async fn signal_handler_returns_live_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }
}
