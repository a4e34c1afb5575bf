//! The JSON-lines loop end to end, with the simulated host.

use std::path::PathBuf;
use std::sync::Arc;

use readout_cli::handlers::run::process_lines;
use readout_cli::output::MemorySink;
use readout_cli::{CliContext, RunArgs, bootstrap};
use readout_core::ReadoutConfig;
use serde_json::Value;
use tokio::io::BufReader;

fn run_args(storage: PathBuf) -> RunArgs {
    RunArgs {
        storage,
        events: false,
        offline_tabs: vec![9],
        restricted_tabs: Vec::new(),
    }
}

async fn context(dir: &tempfile::TempDir) -> (CliContext, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let ctx = bootstrap(
        ReadoutConfig::default(),
        &run_args(dir.path().join("prefs.json")),
        sink.clone(),
    )
    .await
    .unwrap();
    (ctx, sink)
}

fn responses(sink: &MemorySink) -> Vec<Value> {
    sink.values()
        .into_iter()
        .filter(|v| v["kind"] == "response")
        .collect()
}

fn instructions(sink: &MemorySink) -> Vec<String> {
    sink.values()
        .into_iter()
        .filter(|v| v["kind"] == "instruction")
        .map(|v| v["instruction"]["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

const SCRIPT: &str = r#"
# select on tab 1, then read it
{"type":"selection-changed","payload":{"text":"Hello there"},"source":{"tabId":1,"kind":"counterpart","url":"https://example.com/a"}}
{"type":"start-session"}
{"type":"set-speed","payload":{"value":1.5}}
{"type":"pause"}
this is not json
{"type":"stop-session"}
"#;

#[tokio::test]
async fn test_script_produces_one_response_per_message() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, sink) = context(&dir).await;

    let handled = process_lines(&ctx.app, BufReader::new(SCRIPT.as_bytes()), sink.as_ref())
        .await
        .unwrap();
    assert_eq!(handled, 6);

    let responses = responses(&sink);
    assert_eq!(responses.len(), 6);
    let lines: Vec<u64> = responses.iter().map(|r| r["line"].as_u64().unwrap()).collect();
    assert_eq!(lines, vec![3, 4, 5, 6, 7, 8]);

    assert_eq!(responses[1]["response"]["data"]["tabId"], 1);
    assert_eq!(responses[2]["response"]["data"]["speed"], 1.5);
    assert_eq!(responses[3]["response"]["data"]["isPaused"], true);
    assert_eq!(responses[4]["response"]["success"], false);
    assert_eq!(responses[4]["response"]["error"]["kind"], "invalid_input");
    assert_eq!(responses[5]["response"]["data"]["acknowledged"], true);

    assert_eq!(
        instructions(&sink),
        vec!["begin-speech", "set-rate", "pause-speech", "end-speech"]
    );
    ctx.app.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_offline_tab_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, sink) = context(&dir).await;

    let script = r#"{"type":"start-session","payload":{"text":"Hi","tabId":9}}"#;
    process_lines(&ctx.app, BufReader::new(script.as_bytes()), sink.as_ref())
        .await
        .unwrap();

    let responses = responses(&sink);
    assert_eq!(responses[0]["response"]["error"]["kind"], "communication_failure");
    assert!(!ctx.app.orchestrator().is_active());
    assert!(instructions(&sink).is_empty());
}

#[tokio::test]
async fn test_preferences_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (ctx, sink) = context(&dir).await;
        let script = r#"{"type":"set-volume","payload":{"value":40}}
{"type":"set-speed","payload":{"value":2.0}}"#;
        process_lines(&ctx.app, BufReader::new(script.as_bytes()), sink.as_ref())
            .await
            .unwrap();
        ctx.app.shutdown().await.unwrap();
    }

    let (ctx, _sink) = context(&dir).await;
    assert_eq!(ctx.app.volume().effective_for(None), 40);
    assert!((ctx.app.speed().effective_for(None) - 2.0).abs() < 1e-6);
    ctx.app.shutdown().await.unwrap();
}
