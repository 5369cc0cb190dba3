#![allow(clippy::unwrap_used)]
// End-to-end device runs against a wiremock REST server and a local
// console WebSocket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use avh_core::{
    CoreError, InstanceSource, Phase, RunConfig, ScenarioTiming, WaitPolicy, build_client, run,
};

const ACCESS_TOKEN: &str = "access-token-e2e";

// ── Helpers ─────────────────────────────────────────────────────────

/// Responds with 204 and wakes the console server.
struct RebootSignal(Arc<Notify>);

impl Respond for RebootSignal {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.0.notify_one();
        ResponseTemplate::new(204)
    }
}

/// Console server that emits `frames` once the instance is rebooted and
/// then stays open until the client closes.
async fn console_server(frames: Vec<&'static str>, rebooted: Arc<Notify>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        rebooted.notified().await;
        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("ws://{addr}/console/e2e")
}

fn firmware_file(dir: &tempfile::TempDir) -> PathBuf {
    let file = dir.path().join("blinky.axf");
    std::fs::write(&file, b"\x7fELF firmware image").unwrap();
    file
}

fn fast_config(server: &MockServer, instance: InstanceSource, firmware: PathBuf) -> RunConfig {
    let mut config = RunConfig::new(
        format!("{}/api", server.uri()).parse().unwrap(),
        SecretString::from("api-token".to_string()),
        instance,
        firmware,
    );
    config.run_duration = Duration::from_millis(600);
    config.overall_timeout = Duration::from_secs(10);
    config.state_wait = WaitPolicy {
        interval: Duration::from_millis(10),
        max_wait: Duration::from_secs(5),
    };
    config.scenario = ScenarioTiming {
        settle: Duration::from_millis(50),
        readback_delay: Duration::from_millis(20),
        temperature_delta: 10.0,
    };
    config
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "apiToken": "api-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": ACCESS_TOKEN,
            "expiration": "2026-10-18T12:00:00Z"
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_catalog(server: &MockServer, project: Uuid) {
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .and(header("Authorization", format!("Bearer {ACCESS_TOKEN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": project, "name": "Default Project" }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "flavor": "rpi4b", "model": "rpi4b", "type": "iot" },
            { "flavor": "efr32mg24", "model": "efr32mg24", "type": "iot" }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models/efr32mg24/software"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "version": "1.0.0", "buildid": "b100", "filename": "efr32mg24_blinky.elf", "type": "fwbinary" }
        ])))
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_run_against_mock_service() {
    let server = MockServer::start().await;
    let project = Uuid::new_v4();
    let instance = Uuid::new_v4();
    let image = Uuid::new_v4();
    let rebooted = Arc::new(Notify::new());
    let console_url = console_server(vec!["Hello ", "World\r\n"], Arc::clone(&rebooted)).await;
    let dir = tempfile::tempdir().unwrap();
    let firmware = firmware_file(&dir);

    mount_login(&server).await;
    mount_catalog(&server, project).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/instances"))
        .and(body_json(json!({
            "name": "test_efr32",
            "project": project,
            "flavor": "efr32mg24",
            "os": "1.0.0",
            "osbuild": "b100"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": instance })))
        .expect(1)
        .mount(&server)
        .await;

    let state_path = format!("/api/v1/instances/{instance}/state");
    Mock::given(method("GET"))
        .and(path(state_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json("creating"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(state_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json("on"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/instances/{instance}/console")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": console_url })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/images"))
        .and(body_string_contains("fwbinary"))
        .and(body_string_contains("blinky.axf"))
        .and(body_string_contains(instance.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": image,
            "name": "blinky.axf",
            "type": "fwbinary"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/api/v1/instances/{instance}/reboot")))
        .respond_with(RebootSignal(Arc::clone(&rebooted)))
        .expect(1)
        .mount(&server)
        .await;

    let peripherals_path = format!("/api/v1/instances/{instance}/peripherals");
    Mock::given(method("GET"))
        .and(path(peripherals_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "temperature": 20.0,
            "humidity": 40.0
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(peripherals_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "temperature": 30.0,
            "humidity": 40.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(peripherals_path.as_str()))
        .and(body_json(json!({ "temperature": 30.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "temperature": 30.0 })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/instances/{instance}/gpios")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "led": { "banks": [{ "name": "LED0", "state": 1 }] }
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/instances/{instance}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = fast_config(
        &server,
        InstanceSource::Create {
            model: "efr32mg24".into(),
            name: "test_efr32".into(),
        },
        firmware,
    );
    let client = build_client(&config).unwrap();

    let report = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.instance_id, instance);
    assert!(report.created_instance);
    assert_eq!(report.firmware_image, image);
    assert!((report.initial_temperature - 20.0).abs() < f64::EPSILON);
    assert!((report.raised_temperature - 30.0).abs() < f64::EPSILON);
    assert_eq!(report.leds_before, json!([{ "name": "LED0", "state": 1 }]));
    assert_eq!(report.console_output, "Hello World\r\n");
}

#[tokio::test]
async fn test_unmatched_model_fails_without_creating() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_login(&server).await;
    mount_catalog(&server, Uuid::new_v4()).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/instances"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = fast_config(
        &server,
        InstanceSource::Create {
            model: "stm32".into(),
            name: "test_stm32".into(),
        },
        firmware_file(&dir),
    );
    let client = build_client(&config).unwrap();

    let err = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::AcquireInstance);
    match err.source {
        CoreError::NoMatchingModel { prefix, available } => {
            assert_eq!(prefix, "stm32");
            assert_eq!(available, "rpi4b, efr32mg24");
        }
        other => panic!("expected NoMatchingModel, got {other:?}"),
    }
}

#[tokio::test]
async fn test_deadline_during_creation_deletes_instance() {
    let server = MockServer::start().await;
    let instance = Uuid::new_v4();
    let dir = tempfile::tempdir().unwrap();

    mount_login(&server).await;
    mount_catalog(&server, Uuid::new_v4()).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": instance })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/instances/{instance}/state")))
        .respond_with(ResponseTemplate::new(200).set_body_json("creating"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/instances/{instance}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = fast_config(
        &server,
        InstanceSource::Create {
            model: "efr32mg24".into(),
            name: "test_efr32".into(),
        },
        firmware_file(&dir),
    );
    config.overall_timeout = Duration::from_millis(300);
    config.run_duration = Duration::from_millis(100);
    let client = build_client(&config).unwrap();

    let err = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::AcquireInstance);
    assert!(matches!(err.source, CoreError::DeadlineExceeded { .. }));
}

#[tokio::test]
async fn test_unknown_existing_instance_is_never_deleted() {
    let server = MockServer::start().await;
    let instance = Uuid::new_v4();
    let dir = tempfile::tempdir().unwrap();

    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/instances/{instance}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Instance not found"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let config = fast_config(&server, InstanceSource::Existing(instance), firmware_file(&dir));
    let client = build_client(&config).unwrap();

    let err = run(&client, &config, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::AcquireInstance);
    assert!(matches!(err.source, CoreError::InstanceNotFound { id } if id == instance));
}
