// ── Device run orchestration ──
//
// One run walks a fixed sequence of phases against a single instance:
// login, acquire, attach console, upload firmware, reboot, scenario,
// capture. Whatever happens in between, teardown closes the console and
// releases an instance this run created.

use avh_api::{AvhClient, NewImage, PeripheralsUpdate, TlsMode};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{ConsoleStream, VirtualHardware};
use crate::capture::capture_console;
use crate::config::RunConfig;
use crate::error::CoreError;
use crate::provision::{InstanceLease, acquire_instance};
use crate::wait::wait_for_state;

/// Step of a run, attached to every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    Login,
    AcquireInstance,
    AttachConsole,
    UploadFirmware,
    Reboot,
    Scenario,
    Capture,
    Teardown,
}

/// A failed run: the phase that was in flight and what went wrong.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct RunError {
    pub phase: Phase,
    #[source]
    pub source: CoreError,
}

impl RunError {
    pub fn new(phase: Phase, source: CoreError) -> Self {
        Self { phase, source }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub instance_id: Uuid,
    /// `true` if the instance was created by this run.
    pub created_instance: bool,
    pub firmware_image: Uuid,
    pub initial_temperature: f64,
    pub raised_temperature: f64,
    /// LED banks right after boot.
    pub leds_before: serde_json::Value,
    /// LED banks after the temperature change.
    pub leds_after: serde_json::Value,
    pub console_output: String,
}

/// What teardown has to release, filled in as the run progresses.
struct Resources<C> {
    instance: Option<InstanceLease>,
    console: Option<C>,
    phase: Phase,
}

impl<C> Resources<C> {
    fn new() -> Self {
        Self {
            instance: None,
            console: None,
            phase: Phase::Login,
        }
    }
}

/// Build the REST client a run talks to.
pub fn build_client(config: &RunConfig) -> Result<AvhClient, CoreError> {
    Ok(AvhClient::new(config.endpoint.as_str(), &config.transport())?)
}

/// Execute one device run.
///
/// The overall timeout covers login through capture. Expiry of the
/// timeout or cancellation of `cancel` abandons the in-flight step.
/// Teardown runs on every path; its own failures are logged and only
/// reported when the run itself succeeded.
pub async fn run<H: VirtualHardware>(
    hw: &H,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<RunReport, RunError> {
    let mut res = Resources::new();

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CoreError::Interrupted),
        result = tokio::time::timeout(config.overall_timeout, execute(hw, config, &mut res)) => {
            result.unwrap_or(Err(CoreError::DeadlineExceeded {
                timeout: config.overall_timeout,
            }))
        }
    };
    let outcome = outcome.map_err(|source| {
        warn!(phase = %res.phase, error = %source, "run failed");
        RunError::new(res.phase, source)
    });

    let cleanup = teardown(hw, config, res).await;

    match (outcome, cleanup) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(source)) => Err(RunError::new(Phase::Teardown, source)),
        (Err(err), _) => Err(err),
    }
}

async fn execute<H: VirtualHardware>(
    hw: &H,
    config: &RunConfig,
    res: &mut Resources<H::Console>,
) -> Result<RunReport, CoreError> {
    res.phase = Phase::Login;
    let session = hw.login(&config.api_token).await?;
    info!(expires_at = ?session.expires_at, "authenticated");

    res.phase = Phase::AcquireInstance;
    let id = acquire_instance(hw, &config.instance, &config.state_wait, &mut res.instance).await?;
    info!(%id, "instance ready");

    res.phase = Phase::AttachConsole;
    let endpoint = hw.get_instance_console(id).await?;
    let console_tls = TlsMode::from(&config.console_tls);
    let console = res
        .console
        .insert(hw.open_console(&endpoint.url, &console_tls).await?);

    res.phase = Phase::UploadFirmware;
    let name = firmware_name(config)?;
    info!(path = %config.firmware.display(), name, "uploading firmware");
    let image = hw
        .create_image(&NewImage::firmware(name, id), &config.firmware)
        .await?;
    info!(image = %image.id, "firmware uploaded");

    res.phase = Phase::Reboot;
    let discarded = console.discard_buffered();
    debug!(discarded, "dropped console output from before reboot");
    hw.reboot_instance(id).await?;
    info!(%id, "rebooting");
    wait_for_state(hw, id, avh_api::InstanceState::On, &config.state_wait).await?;
    let started = Instant::now();
    info!(%id, "instance back on, running firmware");

    res.phase = Phase::Scenario;
    let timing = &config.scenario;
    let initial_temperature = read_temperature(hw, id).await?;
    info!(temperature = initial_temperature, "initial temperature");
    let leds_before = hw.get_instance_gpios(id).await?.led_banks().clone();
    info!(leds = %leds_before, "initial LED state");

    tokio::time::sleep(timing.settle).await;

    let target = initial_temperature + timing.temperature_delta;
    hw.set_instance_peripherals(id, &PeripheralsUpdate::temperature(target))
        .await?;
    let raised_temperature = read_temperature(hw, id).await?;
    info!(temperature = raised_temperature, "temperature after change");

    tokio::time::sleep(timing.readback_delay).await;
    let leds_after = hw.get_instance_gpios(id).await?.led_banks().clone();
    info!(leds = %leds_after, "LED state after temperature change");

    res.phase = Phase::Capture;
    let console_output = capture_console(console, started, config.run_duration).await?;
    info!(bytes = console_output.len(), "console captured");

    Ok(RunReport {
        instance_id: id,
        created_instance: res.instance.is_some_and(|lease| lease.created),
        firmware_image: image.id,
        initial_temperature,
        raised_temperature,
        leds_before,
        leds_after,
        console_output,
    })
}

async fn read_temperature<H: VirtualHardware>(hw: &H, id: Uuid) -> Result<f64, CoreError> {
    hw.get_instance_peripherals(id)
        .await?
        .temperature
        .ok_or(CoreError::MissingTelemetry {
            field: "temperature",
        })
}

/// Image name for the firmware file: its final path component.
fn firmware_name(config: &RunConfig) -> Result<String, CoreError> {
    config
        .firmware
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CoreError::Firmware {
            path: config.firmware.clone(),
            reason: "path has no file name".into(),
        })
}

/// Release everything the run acquired. Returns the first failure.
async fn teardown<H: VirtualHardware>(
    hw: &H,
    config: &RunConfig,
    res: Resources<H::Console>,
) -> Result<(), CoreError> {
    let mut first_error = None;

    if let Some(console) = res.console {
        debug!("closing console");
        if let Err(e) = console.close(config.console_close_timeout).await {
            warn!(error = %e, "console close failed");
            first_error.get_or_insert(CoreError::from(e));
        }
    }

    match res.instance {
        Some(lease) if lease.created && config.delete_created_instance => {
            info!(id = %lease.id, "deleting instance");
            if let Err(e) = hw.delete_instance(lease.id).await {
                warn!(id = %lease.id, error = %e, "instance delete failed, it may still be running");
                first_error.get_or_insert(CoreError::from(e));
            }
        }
        Some(lease) if lease.created => {
            info!(id = %lease.id, "keeping created instance");
        }
        _ => {}
    }

    first_error.map_or(Ok(()), Err)
}
