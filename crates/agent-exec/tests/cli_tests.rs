//! Tests for the `agent-exec` binary.

use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agent-exec"));
    cmd.env_remove("RUST_LOG").env_remove("AGENT_EXEC_LOG");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_completions_bash() {
    cli()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agent-exec"));
}

#[test]
fn test_run_rejects_negative_timeout() {
    cli()
        .args(["run", "--timeout=-1", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative"));
}

#[test]
fn test_run_rejects_empty_command() {
    cli()
        .args(["run", " "])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Missing or empty command"));
}

#[cfg(unix)]
mod unix {
    use super::*;

    #[test]
    fn test_run_prints_output_and_hint() {
        cli()
            .args(["run", "echo hello"])
            .assert()
            .success()
            .stdout("hello\n")
            .stderr(predicate::str::contains("Command completed"));
    }

    #[test]
    fn test_run_exit_status_mirrors_command() {
        cli()
            .args(["run", "echo failing >&2; exit 3"])
            .assert()
            .code(3)
            .stdout("failing\n")
            .stderr(predicate::str::contains("code 3"));
    }

    #[test]
    fn test_run_json_format() {
        let output = cli()
            .args(["run", "--format", "json", "printf hi"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["output"], "hi");
        assert_eq!(json["exitCode"], 0);
        assert_eq!(json["completed"], true);
        assert_eq!(json["returnReason"], "completed");
        assert_eq!(json["sessionId"].as_str().unwrap().len(), 8);
    }

    #[test]
    fn test_run_terminates_command_after_timeout() {
        let start = Instant::now();
        let output = cli()
            .args(["run", "--format", "json", "--timeout", "0.3", "echo begun; sleep 30"])
            .output()
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(15));
        assert_eq!(output.status.code(), Some(1));
        let json: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["returnReason"], "terminated");
        assert_eq!(json["output"], "begun\n");
        assert_eq!(json["exitCode"], -1);
    }

    #[test]
    fn test_run_stops_at_line_cap() {
        let output = cli()
            .args(["run", "--format", "json", "--max-lines", "5", "seq 1 1000000"])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        let json: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["returnReason"], "maxOutput");
        assert_eq!(json["completed"], true);
    }

    #[test]
    fn test_run_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.txt"), "from cwd\n").unwrap();

        cli()
            .args(["run", "--cwd"])
            .arg(dir.path())
            .arg("cat note.txt")
            .assert()
            .success()
            .stdout("from cwd\n");
    }

    #[test]
    fn test_run_reports_spawn_failure() {
        cli()
            .args(["run", "--cwd", "/definitely/not/a/real/dir", "true"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("Failed to start command"));
    }

    #[test]
    fn test_serve_answers_requests_until_eof() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"execute","params":{"command":"echo served"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"resume","params":{"sessionId":"missing"}}"#,
            "\n",
        );
        let output = cli()
            .arg("serve")
            .write_stdin(input)
            .timeout(Duration::from_secs(30))
            .output()
            .unwrap();
        assert!(output.status.success());

        let responses: Vec<Value> = String::from_utf8(output.stdout)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);

        let execute = responses.iter().find(|r| r["id"] == 1).unwrap();
        assert_eq!(execute["result"]["output"], "served\n");

        let resume = responses.iter().find(|r| r["id"] == 2).unwrap();
        assert_eq!(resume["error"]["code"], -32001);
        assert_eq!(resume["error"]["data"]["category"], "not_found");
    }
}
