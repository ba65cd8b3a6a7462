//! Integration test: start the gateway on a free port and drive the API over
//! HTTP. Covers the health probe, an end-to-end execute, an injection
//! rejection, and the audit trail the attempts leave behind.

use lib::catalog::{CatalogStore, CommandDraft, ParameterDraft};
use lib::config::Config;
use lib::gateway;
use std::path::PathBuf;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Initialized config dir: config.json plus a data dir holding one echo command.
async fn temp_config_dir(dir: &std::path::Path) -> PathBuf {
    let data_dir = dir.join("data");
    std::fs::create_dir_all(&data_dir).expect("create data dir");
    let config_path = dir.join("config.json");
    std::fs::write(&config_path, b"{}").expect("write config.json");

    let catalog = CatalogStore::load(data_dir.join("catalog.json")).await;
    catalog
        .create(CommandDraft {
            name: "echo-message".to_string(),
            description: String::new(),
            command: "echo {{message}}".to_string(),
            category: "system".to_string(),
            enabled: true,
            parameters: vec![ParameterDraft {
                name: "message".to_string(),
                label: "Message".to_string(),
                kind: "text".to_string(),
                required: true,
                default_value: None,
                options: None,
                pattern: None,
                order: 0,
            }],
        })
        .await
        .expect("seed echo command");

    config_path
}

async fn wait_for_health(client: &reqwest::Client, url: &str, port: u16) {
    let mut last_err = None;
    for _ in 0..100 {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let json: serde_json::Value = resp.json().await.expect("parse JSON");
                assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("runbook"));
                assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
                return;
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "GET {} did not return 200 with health JSON within 5s; last error: {:?}",
        url, last_err
    );
}

#[tokio::test]
async fn gateway_executes_and_audits_over_http() {
    let port = free_port();
    let temp = tempfile::tempdir().expect("tempdir");
    let config_path = temp_config_dir(temp.path()).await;

    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();

    let gateway_handle = tokio::spawn(async move {
        let _ = gateway::run_gateway(config, config_path).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    wait_for_health(&client, &format!("{}/", base), port).await;

    // End-to-end: a valid execute returns the echoed output.
    let resp = client
        .post(format!("{}/api/commands/1/execute", base))
        .json(&serde_json::json!({ "parameters": { "message": "hello" } }))
        .send()
        .await
        .expect("execute request");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("parse execute JSON");
    assert_eq!(body["error"], false);
    assert_eq!(body["data"]["result"], "hello\n");
    assert_eq!(body["data"]["status"], "success");
    assert_eq!(body["data"]["command"], "echo-message");

    // Injection attempt: rejected before launch, surfaced generically.
    let resp = client
        .post(format!("{}/api/commands/1/execute", base))
        .json(&serde_json::json!({ "parameters": { "message": "hello; rm -rf /" } }))
        .send()
        .await
        .expect("unsafe execute request");
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.expect("parse error JSON");
    assert_eq!(body["error"], true);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(message.contains("injection"));
    assert!(!message.contains("rm -rf"));

    // Missing required parameter: a 400, not audited.
    let resp = client
        .post(format!("{}/api/commands/1/execute", base))
        .json(&serde_json::json!({ "parameters": {} }))
        .send()
        .await
        .expect("invalid execute request");
    assert_eq!(resp.status(), 400);

    // History holds exactly the two attempts that reached the pipeline.
    let resp = client
        .get(format!("{}/api/commands/1/executions", base))
        .send()
        .await
        .expect("history request");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("parse history JSON");
    assert_eq!(body["meta"]["total"], 2);
    let records = body["data"].as_array().expect("records array");
    assert_eq!(records[0]["status"], "failure");
    assert_eq!(records[1]["status"], "success");

    // The completed execution is in the activity log; the failure is not.
    let resp = client
        .get(format!("{}/api/activities?type=command_execute", base))
        .send()
        .await
        .expect("activities request");
    let body: serde_json::Value = resp.json().await.expect("parse activities JSON");
    assert_eq!(body["meta"]["total"], 1);

    // Unknown command id.
    let resp = client
        .post(format!("{}/api/commands/999/execute", base))
        .json(&serde_json::json!({ "parameters": {} }))
        .send()
        .await
        .expect("missing command request");
    assert_eq!(resp.status(), 404);

    gateway_handle.abort();
}
