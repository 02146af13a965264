//! Inputs and outputs of the [`CommandExecutor`](crate::CommandExecutor)
//! operations, independent of any wire format.

use std::path::PathBuf;
use std::time::Duration;

use agent_exec_core::{ExecutionResult, OutputLimits};

/// Input for starting a command.
#[derive(Debug, Clone, Default)]
pub struct ExecuteInput {
    /// Generated when `None`.
    pub session_id: Option<String>,
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub limits: OutputLimits,
}

impl ExecuteInput {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_limits(mut self, limits: OutputLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Input for continuing a session that is still running.
#[derive(Debug, Clone, Default)]
pub struct ResumeInput {
    pub session_id: String,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
    pub limits: OutputLimits,
}

impl ResumeInput {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_limits(mut self, limits: OutputLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TerminateInput {
    pub session_id: String,
    pub soft_timeout: Option<Duration>,
}

impl TerminateInput {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            soft_timeout: None,
        }
    }

    pub fn with_soft_timeout(mut self, soft_timeout: Duration) -> Self {
        self.soft_timeout = Some(soft_timeout);
        self
    }
}

/// An execution result plus the advice shown alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub result: ExecutionResult,
    pub hint: String,
}
