// ── Runtime run configuration ──
//
// Everything a run needs, fully resolved. The binary builds a `RunConfig`
// from file/env/flags and hands it in; core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use avh_api::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Bundled web PKI roots (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Logged loudly at connect time.
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Where the device instance comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSource {
    /// Reuse an instance that already exists. It is never deleted.
    Existing(Uuid),
    /// Create a fresh instance of the first model whose flavor starts
    /// with `model`.
    Create { model: String, name: String },
}

/// Bounds for polling an instance's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Pause between two state queries.
    pub interval: Duration,
    /// Give up once this much time has passed since the first query.
    pub max_wait: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_wait: Duration::from_secs(30),
        }
    }
}

/// Pacing of the peripheral scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioTiming {
    /// Run time with the initial sensor values before changing them.
    pub settle: Duration,
    /// Pause after changing the temperature so firmware picks it up.
    pub readback_delay: Duration,
    /// Degrees added to the current temperature.
    pub temperature_delta: f64,
}

impl Default for ScenarioTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            readback_delay: Duration::from_millis(500),
            temperature_delta: 10.0,
        }
    }
}

/// Fully resolved configuration for one device run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// REST API root, e.g. `https://arm.corellium.io/api`.
    pub endpoint: Url,
    /// Long-lived API token exchanged for an access token at login.
    pub api_token: SecretString,
    pub instance: InstanceSource,
    /// Local firmware file uploaded to the instance.
    pub firmware: PathBuf,
    /// Console capture window, measured from the post-reboot `on` state.
    pub run_duration: Duration,
    /// Delete an instance this run created. Existing instances are kept.
    pub delete_created_instance: bool,
    /// TLS for the REST API.
    pub tls: TlsVerification,
    /// TLS for the console WebSocket.
    pub console_tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Deadline for everything before teardown.
    pub overall_timeout: Duration,
    pub state_wait: WaitPolicy,
    pub scenario: ScenarioTiming,
    pub console_close_timeout: Duration,
}

impl RunConfig {
    /// A config with default timings for the required fields.
    pub fn new(
        endpoint: Url,
        api_token: SecretString,
        instance: InstanceSource,
        firmware: PathBuf,
    ) -> Self {
        Self {
            endpoint,
            api_token,
            instance,
            firmware,
            run_duration: Duration::from_secs(5),
            delete_created_instance: true,
            tls: TlsVerification::default(),
            console_tls: TlsVerification::default(),
            request_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(60),
            state_wait: WaitPolicy::default(),
            scenario: ScenarioTiming::default(),
            console_close_timeout: Duration::from_secs(1),
        }
    }

    /// Reject timing combinations that would let one step eat the whole
    /// deadline.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.state_wait.interval.is_zero() {
            return Err(CoreError::Config {
                message: "state poll interval must be greater than zero".into(),
            });
        }
        if self.state_wait.max_wait >= self.overall_timeout {
            return Err(CoreError::Config {
                message: format!(
                    "state wait bound ({:?}) must be shorter than the overall timeout ({:?})",
                    self.state_wait.max_wait, self.overall_timeout
                ),
            });
        }
        if self.run_duration >= self.overall_timeout {
            return Err(CoreError::Config {
                message: format!(
                    "run duration ({:?}) must be shorter than the overall timeout ({:?})",
                    self.run_duration, self.overall_timeout
                ),
            });
        }
        if let InstanceSource::Create { model, .. } = &self.instance {
            if model.is_empty() {
                return Err(CoreError::Config {
                    message: "model prefix must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    /// HTTP transport settings for the REST client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.request_timeout,
        }
    }
}
