//! Configuration for avh-run.
//!
//! TOML profiles, credential resolution (flag + env + keyring + plaintext),
//! and translation to `avh_core::RunConfig`. Core never reads config files;
//! the binary loads a [`Config`], collects its flags into [`Overrides`],
//! and hands both to [`build_run_config`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use avh_core::{CoreError, InstanceSource, RunConfig, TlsVerification, WaitPolicy};

/// Public AVH endpoint used when no profile names one.
pub const DEFAULT_ENDPOINT: &str = "https://arm.corellium.io/api";

const KEYRING_SERVICE: &str = "avh-run";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// What to run and for how long.
    #[serde(default)]
    pub scenario: Scenario,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            scenario: Scenario::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Overall run deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default)]
    pub insecure_console: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            request_timeout: default_request_timeout(),
            insecure_console: false,
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_request_timeout() -> u64 {
    30
}

/// A named service profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// REST API root (e.g., "https://app.avh.arm.com/api").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API token (plaintext; prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable name containing the API token.
    pub api_token_env: Option<String>,

    /// Path to a custom CA certificate, used for REST and console.
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate checks on the console WebSocket.
    pub insecure_console: Option<bool>,

    /// Override the per-request timeout.
    pub request_timeout: Option<u64>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Scenario {
    /// Flavor prefix of the model for a new instance.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Reuse this instance instead of creating one. It is never deleted.
    pub instance_id: Option<Uuid>,

    /// Local firmware file to upload.
    pub firmware: Option<PathBuf>,

    /// Console capture window in seconds.
    #[serde(default = "default_run_duration")]
    pub run_duration: u64,

    /// Delete an instance created by the run.
    #[serde(default = "default_true")]
    pub delete_instance: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bound on each wait for an instance state, in seconds.
    #[serde(default = "default_state_wait")]
    pub state_wait: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            model: default_model(),
            instance_name: default_instance_name(),
            instance_id: None,
            firmware: None,
            run_duration: default_run_duration(),
            delete_instance: true,
            poll_interval_ms: default_poll_interval_ms(),
            state_wait: default_state_wait(),
        }
    }
}

fn default_model() -> String {
    "efr32mg24".into()
}
fn default_instance_name() -> String {
    "test_efr32".into()
}
fn default_run_duration() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_state_wait() -> u64 {
    30
}

// ── Command-line overrides ──────────────────────────────────────────

/// Values given on the command line (or their env fallbacks). Every
/// field wins over the config file when set.
#[derive(Debug, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub api_token: Option<SecretString>,
    pub model: Option<String>,
    pub instance_name: Option<String>,
    pub instance_id: Option<Uuid>,
    pub firmware: Option<PathBuf>,
    pub run_duration: Option<Duration>,
    pub timeout: Option<Duration>,
    pub keep_instance: bool,
    pub insecure_console: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "arm", "avh-run").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("avh-run");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment. A missing file is not an
/// error; defaults apply.
///
/// Environment keys use `AVH_` and `__` as the nesting separator, e.g.
/// `AVH_SCENARIO__RUN_DURATION=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AVH_").split("__"));

    Ok(figment.extract()?)
}

// ── Profile resolution ──────────────────────────────────────────────

/// Resolve the active profile name from flags and config.
pub fn active_profile_name(overrides: &Overrides, config: &Config) -> String {
    overrides
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Look up the active profile. A profile named explicitly on the command
/// line must exist; the default profile may be absent.
fn active_profile<'a>(
    overrides: &Overrides,
    config: &'a Config,
    name: &str,
) -> Result<Option<&'a Profile>, ConfigError> {
    match config.profiles.get(name) {
        Some(profile) => Ok(Some(profile)),
        None if overrides.profile.is_some() => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            Err(ConfigError::ProfileNotFound {
                name: name.into(),
                available: if available.is_empty() {
                    "none".into()
                } else {
                    available.join(", ")
                },
            })
        }
        None => Ok(None),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the API token: flag, then the profile's `api_token_env`, then
/// the system keyring, then plaintext in the profile.
pub fn resolve_api_token(
    profile: Option<&Profile>,
    profile_name: &str,
    flag: Option<&SecretString>,
) -> Result<SecretString, ConfigError> {
    // 1. CLI flag / AVH_API_TOKEN
    if let Some(token) = flag {
        return Ok(token.clone());
    }

    // 2. Profile's api_token_env -> env var lookup
    if let Some(env_name) = profile.and_then(|p| p.api_token_env.as_deref()) {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-token")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(token) = profile.and_then(|p| p.api_token.as_ref()) {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── RunConfig translation ───────────────────────────────────────────

/// Translate config + overrides into a validated `RunConfig`.
///
/// This is the single boundary where file/flag types cross into core.
pub fn build_run_config(config: &Config, overrides: &Overrides) -> Result<RunConfig, ConfigError> {
    let profile_name = active_profile_name(overrides, config);
    let profile = active_profile(overrides, config, &profile_name)?;
    let scenario = &config.scenario;

    // 1. Endpoint (flag > profile > built-in)
    let endpoint_str = overrides
        .endpoint
        .as_deref()
        .or(profile.map(|p| p.endpoint.as_str()))
        .unwrap_or(DEFAULT_ENDPOINT);
    let endpoint: url::Url = endpoint_str.parse().map_err(|_| ConfigError::Validation {
        field: "endpoint".into(),
        reason: format!("invalid URL: {endpoint_str}"),
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("expected an http(s) URL, got {endpoint_str}"),
        });
    }

    // 2. Credentials
    let api_token = resolve_api_token(profile, &profile_name, overrides.api_token.as_ref())?;

    // 3. Instance source
    let instance = match overrides.instance_id.or(scenario.instance_id) {
        Some(id) => InstanceSource::Existing(id),
        None => InstanceSource::Create {
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| scenario.model.clone()),
            name: overrides
                .instance_name
                .clone()
                .unwrap_or_else(|| scenario.instance_name.clone()),
        },
    };

    // 4. Firmware
    let firmware = overrides
        .firmware
        .clone()
        .or_else(|| scenario.firmware.clone())
        .ok_or_else(|| ConfigError::Validation {
            field: "firmware".into(),
            reason: "no firmware file given (use --firmware or scenario.firmware)".into(),
        })?;
    if !firmware.is_file() {
        return Err(ConfigError::Validation {
            field: "firmware".into(),
            reason: format!("{} is not a readable file", firmware.display()),
        });
    }

    // 5. TLS
    let tls = profile
        .and_then(|p| p.ca_cert.clone())
        .map_or(TlsVerification::SystemDefaults, TlsVerification::CustomCa);
    let insecure_console = overrides.insecure_console
        || profile
            .and_then(|p| p.insecure_console)
            .unwrap_or(config.defaults.insecure_console);
    let console_tls = if insecure_console {
        TlsVerification::DangerAcceptInvalid
    } else {
        tls.clone()
    };

    // 6. Timing
    let mut run = RunConfig::new(endpoint, api_token, instance, firmware);
    run.run_duration = overrides
        .run_duration
        .unwrap_or(Duration::from_secs(scenario.run_duration));
    run.overall_timeout = overrides
        .timeout
        .unwrap_or(Duration::from_secs(config.defaults.timeout));
    run.request_timeout = Duration::from_secs(
        profile
            .and_then(|p| p.request_timeout)
            .unwrap_or(config.defaults.request_timeout),
    );
    run.state_wait = WaitPolicy {
        interval: Duration::from_millis(scenario.poll_interval_ms),
        max_wait: Duration::from_secs(scenario.state_wait),
    };
    run.delete_created_instance = scenario.delete_instance && !overrides.keep_instance;
    run.tls = tls;
    run.console_tls = console_tls;

    run.validate().map_err(|e| ConfigError::Validation {
        field: "timing".into(),
        reason: match e {
            CoreError::Config { message } => message,
            other => other.to_string(),
        },
    })?;

    debug!(profile = %profile_name, endpoint = %run.endpoint, "resolved run config");
    Ok(run)
}
