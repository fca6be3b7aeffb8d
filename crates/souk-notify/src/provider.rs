// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP push-provider client.
//!
//! Posts the job as JSON to the configured endpoint. 2xx is delivered, 4xx
//! means the provider rejected the token or payload (drop), everything else
//! is transient (retry).

use async_trait::async_trait;
use std::time::Duration;

use souk_core::{OutboundNotificationJob, PushError, PushSender, SoukError};

/// Request timeout for a single provider call. Generous: provider latency
/// only delays the async path, never the chat path.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reqwest-based [`PushSender`].
pub struct HttpPushClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPushClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Result<Self, SoukError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SoukError::store)?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl PushSender for HttpPushClient {
    async fn send(&self, job: &OutboundNotificationJob) -> Result<(), PushError> {
        let mut request = self.http.post(&self.endpoint).json(job);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PushError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(PushError::Rejected(format!("provider returned {status}")))
        } else {
            Err(PushError::Transient(format!("provider returned {status}")))
        }
    }
}
