// ── Core error types ──
//
// Domain errors for a device run. Consumers never match on HTTP status
// codes; the `From<avh_api::Error>` impl folds transport failures into
// the variants below.

use std::path::PathBuf;
use std::time::Duration;

use avh_api::InstanceState;
use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the AVH service: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Catalog / lookup errors ──────────────────────────────────────
    #[error("The account has no projects")]
    NoProject,

    #[error("No hardware model with flavor starting with '{prefix}' (available: {available})")]
    NoMatchingModel { prefix: String, available: String },

    #[error("No software build for model '{model}' with filename starting with '{prefix}'")]
    NoMatchingSoftware { model: String, prefix: String },

    #[error("Instance {id} not found")]
    InstanceNotFound { id: Uuid },

    // ── Instance lifecycle errors ────────────────────────────────────
    #[error("Instance {id} entered the error state")]
    InstanceFailed { id: Uuid },

    #[error("Instance {id} did not reach '{target}' within {waited:?} (last state: '{last}')")]
    StateWaitTimeout {
        id: Uuid,
        target: InstanceState,
        last: InstanceState,
        waited: Duration,
    },

    #[error("Instance reported no {field} reading")]
    MissingTelemetry { field: &'static str },

    // ── Firmware / console errors ────────────────────────────────────
    #[error("Firmware {}: {reason}", path.display())]
    Firmware { path: PathBuf, reason: String },

    #[error("Console error: {message}")]
    Console { message: String },

    // ── Run control ──────────────────────────────────────────────────
    #[error("Run exceeded the overall timeout of {timeout:?}")]
    DeadlineExceeded { timeout: Duration },

    #[error("Run interrupted")]
    Interrupted,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for the timeout class of failures.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::DeadlineExceeded { .. } | Self::StateWaitTimeout { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<avh_api::Error> for CoreError {
    fn from(err: avh_api::Error) -> Self {
        if err.is_auth_failure() {
            return Self::AuthenticationFailed {
                message: err.to_string(),
            };
        }
        if err.is_connection_failure() {
            return Self::ConnectionFailed {
                reason: err.to_string(),
            };
        }

        match err {
            avh_api::Error::Api {
                status, message, ..
            } => Self::Api {
                message,
                status: Some(status),
            },
            avh_api::Error::Transport(e) => Self::Api {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            },
            avh_api::Error::Deserialization { message, .. } => Self::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
            avh_api::Error::File { path, source } => Self::Firmware {
                path,
                reason: source.to_string(),
            },
            avh_api::Error::WebSocket(message) => Self::Console { message },
            avh_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("invalid URL: {e}"),
            },
            other => Self::Api {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_auth_errors_become_authentication_failed() {
        let err: CoreError = avh_api::Error::TokenRejected.into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn websocket_connect_is_a_connection_failure() {
        let err: CoreError = avh_api::Error::WebSocketConnect("refused".into()).into();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }

    #[test]
    fn api_status_is_preserved() {
        let err: CoreError = avh_api::Error::Api {
            status: 500,
            message: "boom".into(),
            code: None,
        }
        .into();
        match err {
            CoreError::Api { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn file_errors_name_the_firmware() {
        let err: CoreError = avh_api::Error::File {
            path: "fw.axf".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(err.to_string().contains("fw.axf"));
    }

    #[test]
    fn wait_timeout_is_timeout_class() {
        let err = CoreError::StateWaitTimeout {
            id: Uuid::nil(),
            target: InstanceState::On,
            last: InstanceState::Booting,
            waited: Duration::from_secs(30),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("'booting'"));
        assert!(!CoreError::Interrupted.is_timeout());
    }
}
