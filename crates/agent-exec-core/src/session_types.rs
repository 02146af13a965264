//! Session identity and lifecycle state.

use std::fmt;
use std::ops::Deref;

use crate::result::ReturnReason;

/// Error returned when SessionId validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdError {
    pub message: String,
}

impl fmt::Display for SessionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SessionIdError {}

/// Caller-visible handle that scopes execute, resume and terminate calls
/// to one process session.
///
/// # Invariants
/// - Session ID must not be empty
/// - Session ID must not be whitespace-only
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new SessionId from a string, validating that it's not empty.
    ///
    /// # Errors
    /// Returns `SessionIdError` if the ID is empty or whitespace-only.
    pub fn try_new(id: impl Into<String>) -> Result<Self, SessionIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SessionIdError {
                message: "Session ID cannot be empty or whitespace-only".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Create a new SessionId without validation. Use for generated IDs.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SessionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a process session.
///
/// ```text
/// Idle -> Running -> Completed | LimitExceeded | Terminated | Failed
///            ^   \
///            |    v
///            TimedOut (process still alive)
/// ```
///
/// `TimedOut` only means the caller stopped waiting. The process keeps
/// running and the session goes back to `Running` on the next resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    Running,
    TimedOut,
    Completed,
    LimitExceeded,
    Terminated,
    Failed,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Idle => "idle",
            ProcessState::Running => "running",
            ProcessState::TimedOut => "timed_out",
            ProcessState::Completed => "completed",
            ProcessState::LimitExceeded => "limit_exceeded",
            ProcessState::Terminated => "terminated",
            ProcessState::Failed => "failed",
        }
    }

    /// No process is left and none will be started again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::Completed
                | ProcessState::LimitExceeded
                | ProcessState::Terminated
                | ProcessState::Failed
        )
    }

    /// A live OS process is attached.
    pub fn holds_process(&self) -> bool {
        matches!(self, ProcessState::Running | ProcessState::TimedOut)
    }

    pub fn return_reason(&self) -> ReturnReason {
        match self {
            ProcessState::Idle | ProcessState::Running => ReturnReason::StillRunning,
            ProcessState::TimedOut => ReturnReason::Timeout,
            ProcessState::Completed => ReturnReason::Completed,
            ProcessState::LimitExceeded => ReturnReason::MaxOutput,
            ProcessState::Terminated => ReturnReason::Terminated,
            ProcessState::Failed => ReturnReason::SpawnFailed,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
