// REST API payload types
//
// Response structs use `#[serde(default)]` for anything the service may
// omit, and `#[serde(flatten)]` catch-alls where the payload is open-ended
// (sensor sets differ per hardware model).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Projects ─────────────────────────────────────────────────────────

/// A project owned by the account. Instances always belong to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Hardware catalog ─────────────────────────────────────────────────

/// A hardware model offered by the service, from `GET v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Identifying string used when creating instances, e.g. `"efr32mg24"`.
    pub flavor: String,
    /// Model key used to query the software catalog.
    pub model: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A firmware/OS build available for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSoftware {
    pub version: String,
    pub buildid: String,
    pub filename: String,
    #[serde(default)]
    pub unique_identifier: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

// ── Instances ────────────────────────────────────────────────────────

/// Lifecycle state reported by `GET v1/instances/{id}/state`.
///
/// States this client has no name for deserialize as [`Unknown`](Self::Unknown).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstanceState {
    On,
    Off,
    Creating,
    Booting,
    Rebooting,
    Restoring,
    Paused,
    Deleting,
    Error,
    #[serde(other)]
    Unknown,
}

/// Body of `POST v1/instances`.
#[derive(Debug, Clone, Serialize)]
pub struct NewInstance {
    pub name: String,
    pub project: Uuid,
    pub flavor: String,
    /// Software version (`ModelSoftware::version`).
    pub os: String,
    /// Software build id (`ModelSoftware::buildid`).
    pub osbuild: String,
}

/// Response of `POST v1/instances`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedInstance {
    pub id: Uuid,
}

/// Instance record from `GET v1/instances/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub flavor: Option<String>,
    #[serde(default)]
    pub project: Option<Uuid>,
    #[serde(default)]
    pub state: Option<InstanceState>,
}

/// Response of `GET v1/instances/{id}/console`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleEndpoint {
    pub url: String,
}

// ── Images ───────────────────────────────────────────────────────────

/// Image type, sent as the `type` multipart field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ImageKind {
    Fwbinary,
    Fwpackage,
    Kernel,
    Devicetree,
    Ramdisk,
    Vmfile,
}

/// Image encoding, sent as the `encoding` multipart field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ImageEncoding {
    Plain,
    Encrypted,
}

/// Metadata for `POST v1/images`. The file content is passed separately.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub kind: ImageKind,
    pub encoding: ImageEncoding,
    pub name: String,
    /// Bind the image to an instance (applied on next boot).
    pub instance: Option<Uuid>,
    pub project: Option<Uuid>,
}

impl NewImage {
    /// A plain firmware binary bound to `instance`.
    pub fn firmware(name: impl Into<String>, instance: Uuid) -> Self {
        Self {
            kind: ImageKind::Fwbinary,
            encoding: ImageEncoding::Plain,
            name: name.into(),
            instance: Some(instance),
            project: None,
        }
    }
}

/// Uploaded image record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

// ── Peripherals ──────────────────────────────────────────────────────

/// Simulated sensor inputs of an instance.
///
/// Only temperature is modelled; the remaining sensors (acceleration,
/// humidity, light, ...) vary by model and land in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Peripherals {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial update for `PUT v1/instances/{id}/peripherals`.
///
/// Unset fields are omitted from the body and keep their current value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PeripheralsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PeripheralsUpdate {
    pub fn temperature(value: f64) -> Self {
        Self {
            temperature: Some(value),
            ..Self::default()
        }
    }
}

/// GPIO snapshot from `GET v1/instances/{id}/gpios`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpioState {
    #[serde(default)]
    pub led: Option<LedState>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// LED bank status. Bank layout is model specific, so it stays raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedState {
    #[serde(default)]
    pub banks: serde_json::Value,
}

impl GpioState {
    /// LED banks, or `Null` if the model exposes no LEDs.
    pub fn led_banks(&self) -> &serde_json::Value {
        self.led.as_ref().map_or(&serde_json::Value::Null, |led| &led.banks)
    }
}
