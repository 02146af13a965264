use std::path::PathBuf;
use std::time::Duration;

use agent_exec_core::OutputLimits;
use agent_exec_ipc::{RpcRequest, RpcResponse, error_codes};
use agent_exec_process::SessionInfo;
use serde_json::{Value, json};

use crate::domain::{CommandOutput, ExecuteInput, ResumeInput, TerminateInput};
use crate::error::ExecError;

/// Convert an ExecError to an RpcResponse.
pub fn exec_error_response(id: u64, err: &ExecError) -> RpcResponse {
    RpcResponse::domain_error(
        id,
        err.code(),
        &err.to_string(),
        err.category().as_str(),
        Some(err.context()),
        Some(err.suggestion()),
    )
}

fn invalid_params(request: &RpcRequest, message: String) -> RpcResponse {
    RpcResponse::error(request.id, error_codes::INVALID_PARAMS, &message)
}

/// Optional non-negative seconds, fractions allowed.
#[allow(clippy::result_large_err)]
fn parse_seconds(request: &RpcRequest, key: &str) -> Result<Option<Duration>, RpcResponse> {
    if !request.has_param(key) {
        return Ok(None);
    }
    match request.param_f64(key) {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
        _ => Err(invalid_params(
            request,
            format!("'{}' must be a non-negative number of seconds", key),
        )),
    }
}

#[allow(clippy::result_large_err)]
fn parse_cap(request: &RpcRequest, key: &str) -> Result<Option<usize>, RpcResponse> {
    if !request.has_param(key) {
        return Ok(None);
    }
    match request.param_usize(key) {
        Some(n) if n > 0 => Ok(Some(n)),
        _ => Err(invalid_params(
            request,
            format!("'{}' must be a positive integer", key),
        )),
    }
}

#[allow(clippy::result_large_err)]
fn parse_limits(request: &RpcRequest) -> Result<OutputLimits, RpcResponse> {
    Ok(OutputLimits {
        max_lines: parse_cap(request, "outputMaxLines")?,
        max_tokens: parse_cap(request, "outputMaxTokens")?,
        max_bytes: parse_cap(request, "outputMaxBytes")?,
    })
}

#[allow(clippy::result_large_err)]
fn parse_optional_str(request: &RpcRequest, key: &str) -> Result<Option<String>, RpcResponse> {
    if !request.has_param(key) {
        return Ok(None);
    }
    request
        .param_str(key)
        .map(|s| Some(s.to_string()))
        .ok_or_else(|| invalid_params(request, format!("'{}' must be a string", key)))
}

/// Parse the required sessionId param.
#[allow(clippy::result_large_err)]
pub fn parse_session_id(request: &RpcRequest) -> Result<String, RpcResponse> {
    request.require_str("sessionId").map(String::from)
}

/// Parse ExecuteInput from RpcRequest.
#[allow(clippy::result_large_err)]
pub fn parse_execute_input(request: &RpcRequest) -> Result<ExecuteInput, RpcResponse> {
    let command = request.require_str("command")?.to_string();
    Ok(ExecuteInput {
        session_id: parse_optional_str(request, "sessionId")?,
        command,
        cwd: parse_optional_str(request, "cwd")?.map(PathBuf::from),
        timeout: parse_seconds(request, "timeout")?,
        limits: parse_limits(request)?,
    })
}

/// Parse ResumeInput from RpcRequest.
#[allow(clippy::result_large_err)]
pub fn parse_resume_input(request: &RpcRequest) -> Result<ResumeInput, RpcResponse> {
    Ok(ResumeInput {
        session_id: parse_session_id(request)?,
        stdin: parse_optional_str(request, "stdin")?,
        timeout: parse_seconds(request, "timeout")?,
        limits: parse_limits(request)?,
    })
}

/// Parse TerminateInput from RpcRequest.
#[allow(clippy::result_large_err)]
pub fn parse_terminate_input(request: &RpcRequest) -> Result<TerminateInput, RpcResponse> {
    Ok(TerminateInput {
        session_id: parse_session_id(request)?,
        soft_timeout: parse_seconds(request, "softTimeout")?,
    })
}

pub fn output_to_json(output: &CommandOutput) -> Value {
    let result = &output.result;
    json!({
        "output": result.output,
        "exitCode": result.exit_code,
        "completed": result.completed(),
        "returnReason": result.return_reason.as_str(),
        "sessionId": result.session_id.as_str(),
        "hint": output.hint
    })
}

/// Convert CommandOutput to RpcResponse.
pub fn output_to_response(id: u64, output: &CommandOutput) -> RpcResponse {
    RpcResponse::success(id, output_to_json(output))
}

pub fn session_info_to_json(info: &SessionInfo) -> Value {
    json!({
        "sessionId": info.id.as_str(),
        "command": info.command,
        "cwd": info.cwd.as_ref().map(|p| p.display().to_string()),
        "pid": info.pid,
        "state": info.state.as_str(),
        "startedAt": info.started_at.map(|t| t.to_rfc3339()),
        "outputBytes": info.output_bytes
    })
}

/// Convert the session listing to RpcResponse.
pub fn sessions_to_response(id: u64, sessions: &[SessionInfo]) -> RpcResponse {
    let list: Vec<Value> = sessions.iter().map(session_info_to_json).collect();
    RpcResponse::success(
        id,
        json!({
            "sessions": list,
            "count": sessions.len()
        }),
    )
}
