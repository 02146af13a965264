//! Process session errors with structured context for AI agents.

use agent_exec_common::error_codes::{self, ErrorCategory};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Session {0} already has a running process")]
    AlreadyRunning(String),
    #[error("No process is running in session {0}")]
    NotRunning(String),
    #[error("Session {0} has already finished")]
    Finished(String),
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },
    #[error("Failed to deliver {signal}: {reason}")]
    Signal { signal: &'static str, reason: String },
}

impl ProcessError {
    /// Returns the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            ProcessError::AlreadyRunning(_) => error_codes::SESSION_ALREADY_RUNNING,
            ProcessError::NotRunning(_) => error_codes::SESSION_NOT_RUNNING,
            ProcessError::Finished(_) => error_codes::SESSION_FINISHED,
            ProcessError::Spawn { .. } => error_codes::SPAWN_FAILED,
            ProcessError::Signal { .. } => error_codes::SIGNAL_FAILED,
        }
    }

    /// Returns the error category for programmatic handling.
    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            ProcessError::AlreadyRunning(id)
            | ProcessError::NotRunning(id)
            | ProcessError::Finished(id) => json!({ "session_id": id }),
            ProcessError::Spawn { command, reason } => json!({
                "operation": "spawn",
                "command": command,
                "reason": reason
            }),
            ProcessError::Signal { signal, reason } => json!({
                "operation": "signal",
                "signal": signal,
                "reason": reason
            }),
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            ProcessError::AlreadyRunning(id) => format!(
                "Session {} is still running a command. Call resume with this session id to keep waiting or send input, terminate it, or execute with a different session id.",
                id
            ),
            ProcessError::NotRunning(id) => format!(
                "No live process in session {}. It may have finished and been cleared. Start the command again with execute.",
                id
            ),
            ProcessError::Finished(id) => format!(
                "Session {} has finished. Run execute with a new session id.",
                id
            ),
            ProcessError::Spawn { reason, .. } => {
                if reason.contains("not found") || reason.contains("No such file") {
                    "The shell or working directory was not found. Check that cwd exists."
                        .to_string()
                } else if reason.contains("Permission denied") {
                    "Permission denied. Check permissions on the working directory.".to_string()
                } else {
                    "Process spawn failed. Check the command and working directory.".to_string()
                }
            }
            ProcessError::Signal { .. } => {
                "The process has most likely exited already; no further action is needed."
                    .to_string()
            }
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        error_codes::is_retryable(self.code())
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            ProcessError::AlreadyRunning(id)
            | ProcessError::NotRunning(id)
            | ProcessError::Finished(id) => Some(id),
            ProcessError::Spawn { .. } | ProcessError::Signal { .. } => None,
        }
    }
}
