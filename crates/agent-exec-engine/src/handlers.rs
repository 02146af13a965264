//! Thin coordinators between the wire and the [`CommandExecutor`].
//!
//! Each handler parses the request with the adapters, delegates to the
//! executor, and converts the outcome back into an RPC response.

use agent_exec_ipc::{RpcRequest, RpcResponse};
use tracing::debug;

use crate::adapters::{
    exec_error_response, output_to_response, parse_execute_input, parse_resume_input,
    parse_session_id, parse_terminate_input, sessions_to_response,
};
use crate::executor::CommandExecutor;

pub async fn handle_request(executor: &CommandExecutor, request: RpcRequest) -> RpcResponse {
    debug!(id = request.id, method = %request.method, "request received");
    match request.method.as_str() {
        "execute" => handle_execute(executor, request).await,
        "resume" => handle_resume(executor, request).await,
        "terminate" => handle_terminate(executor, request).await,
        "peek" => handle_peek(executor, request),
        "sessions" => handle_sessions(executor, request),
        _ => RpcResponse::method_not_found(request.id, &request.method),
    }
}

pub async fn handle_execute(executor: &CommandExecutor, request: RpcRequest) -> RpcResponse {
    let input = match parse_execute_input(&request) {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match executor.execute(input).await {
        Ok(output) => output_to_response(request.id, &output),
        Err(e) => exec_error_response(request.id, &e),
    }
}

pub async fn handle_resume(executor: &CommandExecutor, request: RpcRequest) -> RpcResponse {
    let input = match parse_resume_input(&request) {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match executor.resume(input).await {
        Ok(output) => output_to_response(request.id, &output),
        Err(e) => exec_error_response(request.id, &e),
    }
}

pub async fn handle_terminate(executor: &CommandExecutor, request: RpcRequest) -> RpcResponse {
    let input = match parse_terminate_input(&request) {
        Ok(input) => input,
        Err(resp) => return resp,
    };

    match executor.terminate(input).await {
        Ok(output) => output_to_response(request.id, &output),
        Err(e) => exec_error_response(request.id, &e),
    }
}

pub fn handle_peek(executor: &CommandExecutor, request: RpcRequest) -> RpcResponse {
    let session_id = match parse_session_id(&request) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match executor.peek(&session_id) {
        Ok(output) => output_to_response(request.id, &output),
        Err(e) => exec_error_response(request.id, &e),
    }
}

pub fn handle_sessions(executor: &CommandExecutor, request: RpcRequest) -> RpcResponse {
    sessions_to_response(request.id, &executor.sessions())
}
