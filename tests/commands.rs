//! CLI mode tests: config resolution through `plan`, and a full `run`
//! against a stub endpoint with a JSON summary export.

use std::time::Duration;

use serde_json::json;
use simcue_load::cli::RunArgs;
use simcue_load::commands;
use simcue_load::config::{DataSetting, PriorityMode};
use simcue_load::driver::RampStage;
use simcue_load::LoadTestError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_plan_resolves_config_file_and_fixture() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("messages.json"), r#"["x", "y"]"#).unwrap();
    let config_path = dir.path().join("push.toml");
    std::fs::write(
        &config_path,
        r#"
url = "http://127.0.0.1:3333/push"
start_vus = 0
stages = [ { duration = "10s", target = 5 }, { duration = "10s", target = 0 } ]

[thresholds]
http_req_failed = ["rate < 0.01"]

[payload]
priority = "random"
fixture = "messages.json"
"#,
    )
    .unwrap();

    let args = RunArgs {
        config: Some(config_path),
        ..Default::default()
    };
    let config = commands::plan::run(args).unwrap();

    assert_eq!(config.url, "http://127.0.0.1:3333/push");
    assert_eq!(config.schedule.start_vus(), 0);
    assert_eq!(config.schedule.total_duration(), Duration::from_secs(20));
    assert_eq!(config.priority, PriorityMode::Random);
    assert_eq!(config.data, DataSetting::Fixture(dir.path().join("messages.json")));
    assert_eq!(config.thresholds.len(), 1);
}

#[test]
fn test_plan_rejects_malformed_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("broken.json");
    std::fs::write(&fixture, "[1, 2,").unwrap();

    let args = RunArgs {
        fixture: Some(fixture),
        ..Default::default()
    };
    let err = commands::plan::run(args).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LoadTestError>(),
        Some(LoadTestError::Fixture(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_exports_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enqueue"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("summary.json");

    let args = RunArgs {
        url: Some(format!("{}/enqueue", server.uri())),
        stages: vec![RampStage::new(Duration::from_millis(400), 2)],
        start_vus: Some(2),
        pause: Some(Duration::from_millis(50)),
        thresholds: vec!["http_req_failed: rate == 0".to_string()],
        quiet: true,
        summary_export: Some(summary.clone()),
        ..Default::default()
    };

    let result = commands::run::run(args).await.unwrap();
    assert!(result.thresholds_passed());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(written["passed"], json!(true));
    assert_eq!(written["metrics"]["vus"]["max"], json!(2));
    assert_eq!(
        written["metrics"]["requests"]["total"],
        json!(result.metrics.requests.total)
    );
}
