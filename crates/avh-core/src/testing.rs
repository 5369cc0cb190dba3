// In-memory doubles for the remote service, used by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use avh_api::{
    ConsoleEndpoint, CreatedInstance, Error, GpioState, Image, Instance, InstanceState, LedState,
    Model, ModelSoftware, NewImage, NewInstance, Peripherals, PeripheralsUpdate, Project, Session,
    TlsMode,
};
use secrecy::SecretString;
use uuid::Uuid;

use crate::backend::{ConsoleStream, VirtualHardware};

type CallLog = Arc<Mutex<Vec<String>>>;

pub fn model(flavor: &str) -> Model {
    Model {
        flavor: flavor.into(),
        model: flavor.into(),
        name: None,
        description: None,
        kind: None,
    }
}

pub fn software(filename: &str, version: &str, buildid: &str) -> ModelSoftware {
    ModelSoftware {
        version: version.into(),
        buildid: buildid.into(),
        filename: filename.into(),
        unique_identifier: None,
        kind: None,
    }
}

fn injected(op: &str, status: u16) -> Error {
    Error::Api {
        status,
        message: format!("{op} failed"),
        code: None,
    }
}

// ── MockHardware ────────────────────────────────────────────────────

/// Scripted service. Every call is appended to a shared log as
/// `"<operation> <args>"`.
pub struct MockHardware {
    log: CallLog,
    project_id: Uuid,
    instance_id: Uuid,
    projects: bool,
    models: Vec<Model>,
    software: HashMap<String, Vec<ModelSoftware>>,
    /// Popped per state query; the last entry repeats.
    states: Mutex<VecDeque<InstanceState>>,
    temperature: Mutex<Option<f64>>,
    set_temperatures: Mutex<Vec<f64>>,
    console: Mutex<Option<MockConsole>>,
    failures: HashSet<String>,
    not_found: HashSet<String>,
}

impl MockHardware {
    /// One project, an `efr32mg24` model with one matching build, an
    /// instance that is always `on`, and a console with no output.
    pub fn new() -> Self {
        let mut software = HashMap::new();
        software.insert(
            "efr32mg24".to_string(),
            vec![self::software("efr32mg24_blinky.elf", "1.0.0", "b100")],
        );
        Self {
            log: CallLog::default(),
            project_id: Uuid::new_v4(),
            instance_id: Uuid::new_v4(),
            projects: true,
            models: vec![model("efr32mg24")],
            software,
            states: Mutex::new(VecDeque::from([InstanceState::On])),
            temperature: Mutex::new(None),
            set_temperatures: Mutex::new(Vec::new()),
            console: Mutex::new(Some(MockConsole::new(Vec::<&str>::new()))),
            failures: HashSet::new(),
            not_found: HashSet::new(),
        }
    }

    pub fn with_models(mut self, models: Vec<Model>) -> Self {
        self.models = models;
        self
    }

    pub fn with_software(mut self, model: &str, builds: Vec<ModelSoftware>) -> Self {
        self.software.insert(model.into(), builds);
        self
    }

    pub fn without_projects(mut self) -> Self {
        self.projects = false;
        self
    }

    pub fn with_states(self, states: impl IntoIterator<Item = InstanceState>) -> Self {
        *self.states.lock().unwrap() = states.into_iter().collect();
        self
    }

    /// Initial temperature reading. Updates change it like the real
    /// service does.
    pub fn with_temperature(self, value: f64) -> Self {
        *self.temperature.lock().unwrap() = Some(value);
        self
    }

    pub fn with_console(self, console: MockConsole) -> Self {
        *self.console.lock().unwrap() = Some(console);
        self
    }

    /// Make `op` fail with a server error.
    pub fn failing(mut self, op: &str) -> Self {
        self.failures.insert(op.into());
        self
    }

    /// Make `op` fail with a 404.
    pub fn failing_not_found(mut self, op: &str) -> Self {
        self.not_found.insert(op.into());
        self
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Log entries whose operation is `op`.
    pub fn calls_matching(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .collect()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls_matching(op).len()
    }

    pub fn set_temperatures(&self) -> Vec<f64> {
        self.set_temperatures.lock().unwrap().clone()
    }

    fn record(&self, op: &str, args: &str) -> Result<(), Error> {
        let entry = if args.is_empty() {
            op.to_string()
        } else {
            format!("{op} {args}")
        };
        self.log.lock().unwrap().push(entry);
        if self.not_found.contains(op) {
            return Err(injected(op, 404));
        }
        if self.failures.contains(op) {
            return Err(injected(op, 500));
        }
        Ok(())
    }

    fn peripherals(&self) -> Peripherals {
        Peripherals {
            temperature: *self.temperature.lock().unwrap(),
            extra: serde_json::Map::new(),
        }
    }
}

impl VirtualHardware for MockHardware {
    type Console = MockConsole;

    async fn login(&self, _api_token: &SecretString) -> Result<Session, Error> {
        self.record("login", "")?;
        Ok(Session { expires_at: None })
    }

    async fn list_projects(&self) -> Result<Vec<Project>, Error> {
        self.record("list_projects", "")?;
        if !self.projects {
            return Ok(Vec::new());
        }
        Ok(vec![Project {
            id: self.project_id,
            name: Some("Default Project".into()),
        }])
    }

    async fn list_models(&self) -> Result<Vec<Model>, Error> {
        self.record("list_models", "")?;
        Ok(self.models.clone())
    }

    async fn list_model_software(&self, model: &str) -> Result<Vec<ModelSoftware>, Error> {
        self.record("list_model_software", model)?;
        Ok(self.software.get(model).cloned().unwrap_or_default())
    }

    async fn create_instance(&self, request: &NewInstance) -> Result<CreatedInstance, Error> {
        self.record("create_instance", &request.flavor)?;
        Ok(CreatedInstance {
            id: self.instance_id,
        })
    }

    async fn get_instance(&self, id: Uuid) -> Result<Instance, Error> {
        self.record("get_instance", &id.to_string())?;
        Ok(Instance {
            id,
            name: Some("existing".into()),
            flavor: Some("efr32mg24".into()),
            project: Some(self.project_id),
            state: Some(InstanceState::On),
        })
    }

    async fn get_instance_state(&self, _id: Uuid) -> Result<InstanceState, Error> {
        self.record("get_instance_state", "")?;
        let mut states = self.states.lock().unwrap();
        let state = if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            states.front().copied().unwrap_or(InstanceState::Unknown)
        };
        Ok(state)
    }

    async fn get_instance_console(&self, _id: Uuid) -> Result<ConsoleEndpoint, Error> {
        self.record("get_instance_console", "")?;
        Ok(ConsoleEndpoint {
            url: "wss://console.avh.test/console/1".into(),
        })
    }

    async fn open_console(&self, url: &str, _tls: &TlsMode) -> Result<MockConsole, Error> {
        self.record("open_console", url)?;
        let mut console = self
            .console
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::WebSocketConnect("console already taken".into()))?;
        console.log = Arc::clone(&self.log);
        Ok(console)
    }

    async fn create_image(&self, image: &NewImage, file: &Path) -> Result<Image, Error> {
        self.record("create_image", &format!("{} {}", image.name, file.display()))?;
        Ok(Image {
            id: Uuid::new_v4(),
            name: Some(image.name.clone()),
            kind: Some(image.kind.to_string()),
            size: None,
            status: None,
        })
    }

    async fn reboot_instance(&self, _id: Uuid) -> Result<(), Error> {
        self.record("reboot_instance", "")
    }

    async fn get_instance_peripherals(&self, _id: Uuid) -> Result<Peripherals, Error> {
        self.record("get_instance_peripherals", "")?;
        Ok(self.peripherals())
    }

    async fn set_instance_peripherals(
        &self,
        _id: Uuid,
        update: &PeripheralsUpdate,
    ) -> Result<Peripherals, Error> {
        self.record("set_instance_peripherals", "")?;
        if let Some(value) = update.temperature {
            *self.temperature.lock().unwrap() = Some(value);
            self.set_temperatures.lock().unwrap().push(value);
        }
        Ok(self.peripherals())
    }

    async fn get_instance_gpios(&self, _id: Uuid) -> Result<GpioState, Error> {
        self.record("get_instance_gpios", "")?;
        Ok(GpioState {
            led: Some(LedState {
                banks: serde_json::json!([{ "name": "led0", "state": 0 }]),
            }),
            extra: serde_json::Map::new(),
        })
    }

    async fn delete_instance(&self, id: Uuid) -> Result<(), Error> {
        self.record("delete_instance", &id.to_string())
    }
}

// ── MockConsole ─────────────────────────────────────────────────────

enum WhenDrained {
    End,
    Pending,
    Fail,
}

/// Console that replays queued frames.
pub struct MockConsole {
    frames: VecDeque<Vec<u8>>,
    when_drained: WhenDrained,
    log: CallLog,
}

impl MockConsole {
    pub fn new<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_bytes(
            frames
                .into_iter()
                .map(|f| f.as_ref().as_bytes().to_vec())
                .collect(),
        )
    }

    pub fn from_bytes(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            when_drained: WhenDrained::End,
            log: CallLog::default(),
        }
    }

    /// Keep the stream open with nothing to read once frames run out.
    pub fn pending_when_drained(mut self) -> Self {
        self.when_drained = WhenDrained::Pending;
        self
    }

    /// Yield a transport error once frames run out.
    pub fn failing_when_drained(mut self) -> Self {
        self.when_drained = WhenDrained::Fail;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl ConsoleStream for MockConsole {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, Error>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        match self.when_drained {
            WhenDrained::End => None,
            WhenDrained::Pending => std::future::pending().await,
            WhenDrained::Fail => Some(Err(Error::WebSocket("connection reset".into()))),
        }
    }

    fn discard_buffered(&mut self) -> usize {
        self.log.lock().unwrap().push("console_discard".into());
        0
    }

    async fn close(self, _close_timeout: Duration) -> Result<(), Error> {
        self.log.lock().unwrap().push("console_close".into());
        Ok(())
    }
}
