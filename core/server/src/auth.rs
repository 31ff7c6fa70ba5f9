//! Session tokens for the sensitive routes.
//!
//! `POST /unlock` issues a random 16-byte token (hex on the wire). Requests
//! to `/entries*` present it as `Authorization: Bearer <hex>`, as a bare
//! `Authorization: <hex>`, or as the `token` cookie.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use rand::RngCore;
use std::collections::VecDeque;
use std::sync::Arc;
use subtle::{Choice, ConstantTimeEq};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ApiError;
use crate::state::AppState;
use resivault_common::Error;

/// Token length in bytes.
pub const TOKEN_BYTES: usize = 16;

/// Name of the session cookie.
pub const TOKEN_COOKIE: &str = "token";

/// Live tokens kept per unlock. Issuing past this evicts the oldest.
pub const MAX_SESSIONS: usize = 16;

/// Opaque random session token.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken([u8; TOKEN_BYTES]);

impl SessionToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse the hex form. Anything but exactly 32 hex digits is rejected.
    pub fn from_hex(encoded: &str) -> Option<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        hex::decode_to_slice(encoded, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Constant-time equality.
    pub fn matches(&self, other: &SessionToken) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Tokens issued since the vault was last locked.
#[derive(Debug, Default)]
pub struct SessionTokens {
    tokens: VecDeque<SessionToken>,
}

impl SessionTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token and return its hex form.
    ///
    /// At most [`MAX_SESSIONS`] tokens stay valid; the oldest is dropped first.
    pub fn issue(&mut self) -> String {
        let token = SessionToken::generate();
        let encoded = token.to_hex();
        while self.tokens.len() >= MAX_SESSIONS {
            self.tokens.pop_front();
            debug!("Evicted oldest session token");
        }
        self.tokens.push_back(token);
        encoded
    }

    /// Whether `candidate` matches any issued token.
    ///
    /// Compares against every token without short-circuiting.
    pub fn verify(&self, candidate: &str) -> bool {
        let Some(candidate) = SessionToken::from_hex(candidate) else {
            return false;
        };
        let found = self
            .tokens
            .iter()
            .fold(Choice::from(0), |acc, token| acc | token.matches(&candidate));
        bool::from(found)
    }

    pub fn revoke_all(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// `Set-Cookie` value carrying `token`.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/",
        TOKEN_COOKIE, token
    )
}

/// Token presented by a request, header first, then cookie.
pub fn presented_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .filter(|v| !v.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Middleware rejecting requests without a valid session token.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = presented_token(request.headers()) else {
        debug!(path = %request.uri().path(), "Missing session token");
        return Err(Error::Unauthorized.into());
    };

    if !state.sessions.lock().await.verify(&token) {
        debug!(path = %request.uri().path(), "Unknown session token");
        return Err(Error::Unauthorized.into());
    }

    Ok(next.run(request).await)
}
