//! The stdio JSON-RPC loop driven over in-memory streams.

#![cfg(unix)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agent_exec_core::OutputLimits;
use agent_exec_engine::{CommandExecutor, EngineConfig, serve};
use agent_exec_ipc::{RpcResponse, error_codes};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::Notify;

fn executor() -> Arc<CommandExecutor> {
    Arc::new(CommandExecutor::new(
        EngineConfig::default()
            .with_default_limits(OutputLimits::unbounded())
            .with_soft_timeout(Duration::from_secs(2)),
    ))
}

fn responses(output: &[u8]) -> HashMap<u64, RpcResponse> {
    std::str::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| {
            let response: RpcResponse = serde_json::from_str(line).unwrap();
            (response.id, response)
        })
        .collect()
}

#[tokio::test]
async fn test_serves_until_end_of_input() {
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"execute","params":{"command":"echo hello","timeout":5}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"sessions"}"#,
        "\n",
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"launch"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":4,"method":"resume","params":{}}"#,
        "\n",
    );
    let mut output = Vec::new();

    serve(executor(), input.as_bytes(), &mut output, Arc::new(Notify::new()))
        .await
        .unwrap();

    let by_id = responses(&output);
    assert_eq!(by_id.len(), 4);

    let result = by_id[&1].result.as_ref().unwrap();
    assert_eq!(result["output"], "hello\n");
    assert_eq!(result["exitCode"], 0);
    assert_eq!(result["completed"], true);
    assert_eq!(result["returnReason"], "completed");
    assert!(result["hint"].is_string());

    assert!(by_id[&2].result.as_ref().unwrap()["count"].is_u64());
    assert_eq!(
        by_id[&3].error.as_ref().unwrap().code,
        error_codes::METHOD_NOT_FOUND
    );
    assert_eq!(
        by_id[&4].error.as_ref().unwrap().code,
        error_codes::INVALID_PARAMS
    );
}

#[tokio::test]
async fn test_malformed_line_gets_parse_error() {
    let input = "{not json}\n";
    let mut output = Vec::new();

    serve(executor(), input.as_bytes(), &mut output, Arc::new(Notify::new()))
        .await
        .unwrap();

    let by_id = responses(&output);
    let error = by_id[&0].error.as_ref().unwrap();
    assert_eq!(error.code, error_codes::PARSE_ERROR);
}

#[tokio::test]
async fn test_end_of_input_terminates_leftover_sessions() {
    let executor = executor();
    let input = concat!(
        r#"{"id":1,"method":"execute","params":{"command":"sleep 30","sessionId":"left","timeout":0.2}}"#,
        "\n",
    );
    let mut output = Vec::new();

    serve(
        Arc::clone(&executor),
        input.as_bytes(),
        &mut output,
        Arc::new(Notify::new()),
    )
    .await
    .unwrap();

    let by_id = responses(&output);
    assert_eq!(by_id[&1].result.as_ref().unwrap()["returnReason"], "timeout");
    assert!(executor.sessions().is_empty());
}

#[tokio::test]
async fn test_shutdown_signal_interrupts_in_flight_execute() {
    let (mut client, server) = tokio::io::duplex(4096);
    client
        .write_all(
            concat!(
                r#"{"id":7,"method":"execute","params":{"command":"sleep 30","timeout":60}}"#,
                "\n"
            )
            .as_bytes(),
        )
        .await
        .unwrap();

    let shutdown = Arc::new(Notify::new());
    let mut output = Vec::new();
    let trigger = Arc::clone(&shutdown);

    let (served, _) = tokio::join!(
        serve(executor(), BufReader::new(server), &mut output, shutdown),
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.notify_one();
        }
    );
    served.unwrap();
    drop(client);

    let by_id = responses(&output);
    let result = by_id[&7].result.as_ref().unwrap();
    assert_eq!(result["returnReason"], "terminated");
    assert_eq!(result["completed"], true);
}
