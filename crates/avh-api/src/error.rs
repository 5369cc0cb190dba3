use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `avh-api` crate.
///
/// Covers authentication, HTTP transport, API-level failures, payload
/// decoding, and the console WebSocket. `avh-core` maps these into
/// domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected (bad API token, disabled account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated endpoint was called before `login`.
    #[error("Not authenticated -- call login first")]
    NotAuthenticated,

    /// The access token was rejected by the service (expired or revoked).
    #[error("Access token rejected -- re-authentication required")]
    TokenRejected,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success response from the REST API.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A local file (firmware image) could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Console WebSocket ───────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Error while reading from or closing an open WebSocket.
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl Error {
    /// Returns `true` if this error means the credentials are bad or stale.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::NotAuthenticated | Self::TokenRejected
        )
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the request never reached the service.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::WebSocketConnect(_) | Self::Tls(_) => true,
            _ => false,
        }
    }
}
