//! One-shot execution behind `agent-exec run`.

use agent_exec_core::{OutputLimits, ReturnReason};
use agent_exec_engine::adapters::output_to_json;
use agent_exec_engine::{
    CommandExecutor, CommandOutput, EngineConfig, ExecError, ExecuteInput, TerminateInput,
};
use tracing::debug;

use crate::commands::{OutputFormat, RunArgs};

/// Run `args.command` to completion, terminating it if it outlives the
/// timeout.
pub async fn run_once(config: EngineConfig, args: &RunArgs) -> Result<CommandOutput, ExecError> {
    let executor = CommandExecutor::new(config);
    let limits = OutputLimits {
        max_lines: args.max_lines,
        max_tokens: args.max_tokens,
        max_bytes: args.max_bytes,
    };
    let input = ExecuteInput {
        session_id: None,
        command: args.command.clone(),
        cwd: args.cwd.clone(),
        timeout: args.timeout,
        limits,
    };

    let output = executor.execute(input).await?;
    if output.result.completed() {
        return Ok(output);
    }

    let session_id = output.result.session_id.to_string();
    debug!(session_id = %session_id, "timed out, terminating");
    let terminated = executor.terminate(TerminateInput::new(session_id)).await?;
    Ok(CommandOutput {
        hint: "Command did not finish within the timeout and was terminated.".to_string(),
        result: terminated.result,
    })
}

/// Process exit status for a finished run.
pub fn exit_status(output: &CommandOutput) -> i32 {
    let result = &output.result;
    if result.return_reason == ReturnReason::Completed {
        if (0..=255).contains(&result.exit_code) {
            result.exit_code
        } else {
            1
        }
    } else {
        1
    }
}

/// Text goes to stdout with the hint on stderr so pipelines see only the
/// command's own output.
pub fn render(output: &CommandOutput, format: OutputFormat) -> (String, Option<String>) {
    match format {
        OutputFormat::Text => (output.result.output.clone(), Some(output.hint.clone())),
        OutputFormat::Json => {
            let json = output_to_json(output);
            let text = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
            (format!("{}\n", text), None)
        }
    }
}
