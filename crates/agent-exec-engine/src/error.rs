//! Façade-level errors.
//!
//! These errors are mapped to specific JSON-RPC error codes and include
//! structured context for AI agents to handle programmatically.

use agent_exec_common::error_codes::{self, ErrorCategory};
use agent_exec_process::ProcessError;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Session limit reached: maximum {0} sessions allowed")]
    LimitReached(usize),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl ExecError {
    /// Returns the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            ExecError::InvalidInput(_) => error_codes::INVALID_INPUT,
            ExecError::LimitReached(_) => error_codes::SESSION_LIMIT,
            ExecError::Process(err) => err.code(),
        }
    }

    /// Returns the error category for programmatic handling.
    pub fn category(&self) -> ErrorCategory {
        error_codes::category_for_code(self.code())
    }

    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            ExecError::InvalidInput(reason) => json!({ "reason": reason }),
            ExecError::LimitReached(max) => json!({ "max_sessions": max }),
            ExecError::Process(err) => err.context(),
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            ExecError::InvalidInput(_) => {
                "Check the request parameters: execute needs a non-empty command, resume and terminate need a sessionId."
                    .to_string()
            }
            ExecError::LimitReached(_) => {
                "Too many sessions are open. Terminate sessions you no longer need, then retry."
                    .to_string()
            }
            ExecError::Process(err) => err.suggestion(),
        }
    }

    /// Returns whether this error is potentially transient and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        error_codes::is_retryable(self.code())
    }
}
