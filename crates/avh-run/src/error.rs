//! CLI error types with miette diagnostics.
//!
//! Maps config and run failures into user-facing errors with actionable
//! help text and a coarse exit code.

use miette::Diagnostic;
use thiserror::Error;

use avh_config::ConfigError;
use avh_core::{CoreError, Phase, RunError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the AVH service")]
    #[diagnostic(
        code(avh::connection_failed),
        help(
            "Check the endpoint URL and your network connection.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(avh::auth_failed),
        help("Verify the API token for this endpoint; tokens are issued per account.")
    )]
    AuthFailed { message: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(avh::no_credentials),
        help(
            "Pass --api-token, set AVH_API_TOKEN, set api_token_env in the profile,\n\
             or store the token in the system keyring as avh-run / {profile}/api-token."
        )
    )]
    NoCredentials { profile: String },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(avh::not_found),
        help("Check the model prefix or instance ID against your AVH account.")
    )]
    NotFound { message: String },

    // ── Run ──────────────────────────────────────────────────────────
    #[error("Run failed during {phase}: {message}")]
    #[diagnostic(code(avh::run_failed))]
    RunFailed { phase: Phase, message: String },

    #[error("Run timed out during {phase}: {message}")]
    #[diagnostic(
        code(avh::timeout),
        help("Increase the deadline with --timeout or the state wait bound in the config.")
    )]
    Timeout { phase: Phase, message: String },

    #[error("Run interrupted during {phase}")]
    #[diagnostic(code(avh::interrupted))]
    Interrupted { phase: Phase },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(avh::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(avh::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(avh::config),
        help("Check the config file at {path}")
    )]
    Config { message: String, path: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Could not render the run report: {0}")]
    #[diagnostic(code(avh::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Interrupted { .. } => exit_code::INTERRUPTED,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::Config { .. } => {
                exit_code::USAGE
            }
            Self::RunFailed { .. } | Self::Json(_) => exit_code::GENERAL,
        }
    }

    /// Attach a config file path to a config loading error.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
                path: path.display().to_string(),
            },
            other => other.into(),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                Self::ProfileNotFound { name, available }
            }
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
                path: avh_config::config_path().display().to_string(),
            },
        }
    }
}

// ── CoreError / RunError → CliError mapping ──────────────────────────

impl From<RunError> for CliError {
    fn from(err: RunError) -> Self {
        let RunError { phase, source } = err;
        match source {
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            e @ (CoreError::NoProject
            | CoreError::NoMatchingModel { .. }
            | CoreError::NoMatchingSoftware { .. }
            | CoreError::InstanceNotFound { .. }) => Self::NotFound {
                message: e.to_string(),
            },
            e @ (CoreError::DeadlineExceeded { .. } | CoreError::StateWaitTimeout { .. }) => {
                Self::Timeout {
                    phase,
                    message: e.to_string(),
                }
            }
            CoreError::Interrupted => Self::Interrupted { phase },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            other => Self::RunFailed {
                phase,
                message: other.to_string(),
            },
        }
    }
}

/// Failures while setting up the client, before any phase runs.
impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            other => Self::Validation {
                field: "client".into(),
                reason: other.to_string(),
            },
        }
    }
}
