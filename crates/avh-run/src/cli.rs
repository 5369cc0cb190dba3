//! Clap derive structures for the `avh-run` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use secrecy::SecretString;
use uuid::Uuid;

use avh_config::Overrides;

/// avh-run -- deploy firmware to an Arm Virtual Hardware device and watch it run
#[derive(Debug, Parser)]
#[command(
    name = "avh-run",
    version,
    about = "Run firmware on an Arm Virtual Hardware instance and capture its console",
    long_about = "Logs in to the AVH service, reuses or creates a device instance, uploads\n\
        the firmware, reboots, drives a short peripheral scenario (temperature\n\
        and LEDs), and prints the UART output captured during the run.\n\n\
        Instances created by a run are deleted afterwards unless --keep-instance\n\
        is given."
)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "AVH_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Service profile to use
    #[arg(long, short = 'p', env = "AVH_PROFILE")]
    pub profile: Option<String>,

    /// REST API endpoint (overrides profile)
    #[arg(long, env = "AVH_ENDPOINT", value_name = "URL")]
    pub endpoint: Option<String>,

    /// API token
    #[arg(long, env = "AVH_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Flavor prefix of the model for a new instance
    #[arg(long, short = 'm', env = "AVH_MODEL")]
    pub model: Option<String>,

    /// Name of a new instance
    #[arg(long, env = "AVH_INSTANCE_NAME")]
    pub instance_name: Option<String>,

    /// Reuse an existing instance instead of creating one (takes
    /// precedence over --model)
    #[arg(long, env = "AVH_INSTANCE_ID", value_name = "UUID")]
    pub instance_id: Option<Uuid>,

    /// Firmware file to upload
    #[arg(long, short = 'f', env = "AVH_FIRMWARE", value_name = "PATH")]
    pub firmware: Option<PathBuf>,

    /// How long to capture console output, e.g. "5s"
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Overall deadline for the run, e.g. "60s" or "2m"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Keep an instance created by this run
    #[arg(long)]
    pub keep_instance: bool,

    /// Accept any TLS certificate on the console WebSocket
    #[arg(long)]
    pub insecure_console: bool,

    /// Output format
    #[arg(long, short = 'o', default_value = "text")]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto")]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// UART log between banners
    Text,
    /// Run report as pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

impl Cli {
    /// Flag values that override the config file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            endpoint: self.endpoint.clone(),
            api_token: self.api_token.clone().map(SecretString::from),
            model: self.model.clone(),
            instance_name: self.instance_name.clone(),
            instance_id: self.instance_id,
            firmware: self.firmware.clone(),
            run_duration: self.duration,
            timeout: self.timeout,
            keep_instance: self.keep_instance,
            insecure_console: self.insecure_console,
        }
    }
}
