//! Short follow-up advice attached to every execution result.

use std::time::Duration;

use agent_exec_core::{ExecutionResult, ReturnReason};

/// Advice for the agent reading `result`. `timeout` is the wait that
/// produced a `timeout` result.
pub fn hint_for(result: &ExecutionResult, timeout: Option<Duration>) -> String {
    let id = result.session_id.as_str();
    match result.return_reason {
        ReturnReason::Completed if result.exit_code != 0 => format!(
            "Command exited with code {}. Check the output for the error.",
            result.exit_code
        ),
        ReturnReason::Completed if result.output.is_empty() => {
            "Command completed successfully with no output.".to_string()
        }
        ReturnReason::Completed => "Command completed.".to_string(),
        ReturnReason::Timeout => {
            let waited = timeout
                .map(|t| format!(" after {}", format_secs(t)))
                .unwrap_or_default();
            format!(
                "Command is still running{}. It may be waiting for input. Call resume with sessionId {} and stdin to answer it or to keep waiting, or call terminate to stop it.",
                waited, id
            )
        }
        ReturnReason::MaxOutput => "Output exceeded the configured cap and the process was stopped. Narrow the output (filter with grep, use head or tail, or pass quieter flags) and run it again.".to_string(),
        ReturnReason::Terminated => "Command was terminated.".to_string(),
        ReturnReason::StillRunning => format!(
            "Command is still running. Call resume with sessionId {} to wait for more output.",
            id
        ),
        ReturnReason::SpawnFailed => {
            "Command could not be started. Check the working directory and try again.".to_string()
        }
    }
}

fn format_secs(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}s", secs as u64)
    } else {
        format!("{:.1}s", secs)
    }
}
