use std::fmt;

use crate::session_types::SessionId;

/// Exit code reported when the process has not exited on its own: still
/// running, killed by the engine, or ended by a signal.
pub const NO_EXIT_CODE: i32 = -1;

/// Why an execute, resume or terminate call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnReason {
    Completed,
    Timeout,
    MaxOutput,
    Terminated,
    StillRunning,
    SpawnFailed,
}

impl ReturnReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnReason::Completed => "completed",
            ReturnReason::Timeout => "timeout",
            ReturnReason::MaxOutput => "maxOutput",
            ReturnReason::Terminated => "terminated",
            ReturnReason::StillRunning => "stillRunning",
            ReturnReason::SpawnFailed => "spawnFailed",
        }
    }

    /// The process behind this result is gone.
    pub fn is_final(&self) -> bool {
        !matches!(self, ReturnReason::Timeout | ReturnReason::StillRunning)
    }
}

impl fmt::Display for ReturnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot handed back to the caller.
///
/// `output` is everything captured since the session started, so two
/// results from the same session always share a common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub session_id: SessionId,
    pub output: String,
    pub exit_code: i32,
    pub return_reason: ReturnReason,
}

impl ExecutionResult {
    pub fn new(
        session_id: SessionId,
        output: String,
        exit_code: i32,
        return_reason: ReturnReason,
    ) -> Self {
        Self {
            session_id,
            output,
            exit_code,
            return_reason,
        }
    }

    pub fn spawn_failure(session_id: SessionId, message: impl Into<String>) -> Self {
        Self::new(
            session_id,
            message.into(),
            NO_EXIT_CODE,
            ReturnReason::SpawnFailed,
        )
    }

    pub fn completed(&self) -> bool {
        self.return_reason.is_final()
    }
}
