//! Schedule-manager calls and how their failures read.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cadence_config::CadenceConfig;
use cadence_core::errors::describe_registry_error;
use cadence_registry::{HttpTimeouts, ScheduleClient, ToggleState};

fn client(server: &MockServer, path: &str, api_key: Option<&str>) -> ScheduleClient {
    ScheduleClient::new(
        &server.uri(),
        path,
        api_key.map(ToString::to_string),
        HttpTimeouts::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn configured_mount_and_key_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[schedule]\npath = \"/admin/schedule/\"\napi_key = \"k-123\"\n",
    )
    .unwrap();
    let config = CadenceConfig::load_from(&config_path).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/schedule/toggle/pkg%2F1"))
        .and(header("authorization", "k-123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "job_id": "pkg/1", "state": "resumed" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        &server,
        &config.schedule_path(),
        config.schedule_api_key().as_deref(),
    );
    assert_eq!(client.toggle("pkg/1").await.unwrap(), ToggleState::Resumed);
}

#[tokio::test]
async fn rejected_key_points_at_the_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/schedule/toggle/job-7"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid API key" })),
        )
        .mount(&server)
        .await;

    let err = client(&server, "/schedule", Some("stale"))
        .toggle("job-7")
        .await
        .unwrap_err();
    assert_eq!(
        describe_registry_error(&err),
        "Request failed (401): Invalid API key \
         Check the api_key under [schedule] in the config file."
    );
}

#[tokio::test]
async fn error_events_can_be_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule/logs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                { "id": 3, "job_id": "pkg/1", "event_type": "EVENT_JOB_MISSED",
                  "timestamp": "2025-12-18T11:00:00" },
                { "id": 2, "job_id": "pkg/1", "event_type": "EVENT_JOB_EXECUTED",
                  "timestamp": "2025-12-18T10:57:15" }
            ]
        })))
        .mount(&server)
        .await;

    let events = client(&server, "/schedule", None).events().await.unwrap();
    let errors: Vec<_> = events.iter().filter(|event| event.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].id, 3);
}
