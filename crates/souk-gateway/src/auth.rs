// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer credential verification for the gateway.
//!
//! Credentials are HMAC-SHA256 signed against a shared secret:
//! `base64url(claims JSON) . hex(hmac)`. Verification checks the signature
//! first, then expiry. Failures carry specific reasons; the connection is
//! refused with that reason and never retried by the server.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use souk_core::{Role, SoukError, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Verified identity carried by a connection credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// The authenticated user.
    pub sub: UserId,
    /// Role attached to the identity.
    pub role: Role,
    /// Expiry as Unix seconds.
    pub exp: i64,
}

impl Claims {
    /// Claims for `user` expiring `ttl_secs` from now.
    pub fn new(sub: UserId, role: Role, ttl_secs: i64) -> Self {
        Self {
            sub,
            role,
            exp: chrono::Utc::now().timestamp() + ttl_secs,
        }
    }
}

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret the credential signatures are verified against.
    pub secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Sign claims into a bearer credential. Used by token issuance and tests.
pub fn sign_token(secret: &str, claims: &Claims) -> String {
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(claims).expect("claims serialize to JSON"),
    );
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{payload}.{signature}")
}

/// Verify a bearer credential against the shared secret.
///
/// Returns [`SoukError::Auth`] with a specific reason for every failure
/// mode: malformed structure, signature mismatch, undecodable claims, or
/// expiry.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, SoukError> {
    let (payload, signature_hex) = token
        .split_once('.')
        .ok_or_else(|| SoukError::Auth("malformed credential".to_string()))?;

    let signature = hex::decode(signature_hex)
        .map_err(|_| SoukError::Auth("malformed credential signature".to_string()))?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SoukError::Auth("credential signature mismatch".to_string()))?;

    let claims_json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| SoukError::Auth("malformed credential payload".to_string()))?;
    let claims: Claims = serde_json::from_slice(&claims_json)
        .map_err(|_| SoukError::Auth("malformed credential claims".to_string()))?;

    if claims.exp < chrono::Utc::now().timestamp() {
        return Err(SoukError::Auth("credential expired".to_string()));
    }

    Ok(claims)
}

/// Pull a bearer credential out of request headers.
pub fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Middleware validating the bearer credential on REST routes.
///
/// WebSocket connections authenticate during the handshake instead, so this
/// layer only guards `/v1/*`.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let token = bearer_from_headers(request.headers()).ok_or((
        StatusCode::UNAUTHORIZED,
        "missing bearer credential".to_string(),
    ))?;

    match verify_token(&auth.secret, &token) {
        Ok(_claims) => Ok(next.run(request).await),
        Err(e) => Err((StatusCode::UNAUTHORIZED, e.to_string())),
    }
}
