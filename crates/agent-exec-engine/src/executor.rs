use std::sync::Arc;
use std::time::Duration;

use agent_exec_core::{ExecutionResult, SessionId};
use agent_exec_process::{ExecRequest, ProcessError, ProcessSession, ResumeRequest, SessionInfo};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{CommandOutput, ExecuteInput, ResumeInput, TerminateInput};
use crate::error::ExecError;
use crate::hints::hint_for;
use crate::registry::{SessionRegistry, generate_session_id};

/// Entry point for running commands.
///
/// Owns the session registry. Every call that leaves a session without a
/// process evicts it, so the next call with that id is treated as unknown.
pub struct CommandExecutor {
    registry: SessionRegistry,
    config: EngineConfig,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CommandExecutor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: SessionRegistry::with_max_sessions(config.max_sessions),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub async fn execute(&self, input: ExecuteInput) -> Result<CommandOutput, ExecError> {
        if input.command.trim().is_empty() {
            return Err(ExecError::InvalidInput("Missing or empty command".to_string()));
        }
        let session_id = match input.session_id {
            Some(id) => SessionId::try_new(id).map_err(|e| ExecError::InvalidInput(e.message))?,
            None => generate_session_id(),
        };

        let session = self.registry.get_or_create(&session_id)?;
        let timeout = input.timeout.unwrap_or(self.config.command_timeout);
        let request = ExecRequest {
            command: input.command,
            cwd: input.cwd,
            timeout,
            limits: input.limits.or(self.config.default_limits),
        };

        let result = match session.execute(request).await {
            Ok(result) => result,
            Err(ProcessError::Spawn { reason, .. }) => ExecutionResult::spawn_failure(
                session_id,
                format!("Failed to start command: {}", reason),
            ),
            Err(err) => return Err(err.into()),
        };
        Ok(self.finish(&session, result, Some(timeout)))
    }

    pub async fn resume(&self, input: ResumeInput) -> Result<CommandOutput, ExecError> {
        let session = self.lookup(&input.session_id)?;
        let timeout = input.timeout.unwrap_or(self.config.command_timeout);
        let request = ResumeRequest {
            stdin: input.stdin,
            timeout,
            limits: input.limits.or(self.config.default_limits),
        };

        match session.resume(request).await {
            Ok(result) => Ok(self.finish(&session, result, Some(timeout))),
            Err(err) => Err(self.evict_on_error(&session, err)),
        }
    }

    pub async fn terminate(&self, input: TerminateInput) -> Result<CommandOutput, ExecError> {
        let session = self.lookup(&input.session_id)?;
        let soft_timeout = input.soft_timeout.unwrap_or(self.config.soft_timeout);

        match session.terminate(soft_timeout).await {
            Ok(result) => Ok(self.finish(&session, result, None)),
            Err(err) => Err(self.evict_on_error(&session, err)),
        }
    }

    /// Current output of a registered session without waiting on it.
    pub fn peek(&self, session_id: &str) -> Result<CommandOutput, ExecError> {
        let session = self.lookup(session_id)?;
        let result = session.snapshot();
        let hint = hint_for(&result, None);
        Ok(CommandOutput { result, hint })
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.registry.list()
    }

    /// Terminate every live session and empty the registry. Returns how
    /// many sessions had to be stopped.
    pub async fn shutdown(&self) -> usize {
        let sessions = self.registry.drain();
        let soft_timeout = self.config.soft_timeout;

        let mut tasks = JoinSet::new();
        for session in sessions {
            if !session.state().holds_process() {
                continue;
            }
            tasks.spawn(async move {
                if let Err(e) = session.terminate(soft_timeout).await {
                    debug!(session_id = %session.id(), error = %e, "nothing to terminate");
                }
            });
        }

        let stopped = tasks.len();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "session shutdown task failed");
            }
        }
        if stopped > 0 {
            info!(sessions = stopped, "terminated live sessions");
        }
        stopped
    }

    fn lookup(&self, session_id: &str) -> Result<Arc<ProcessSession>, ExecError> {
        if session_id.trim().is_empty() {
            return Err(ExecError::InvalidInput("Missing or empty sessionId".to_string()));
        }
        self.registry
            .get(session_id)
            .ok_or_else(|| ProcessError::NotRunning(session_id.to_string()).into())
    }

    fn finish(
        &self,
        session: &Arc<ProcessSession>,
        result: ExecutionResult,
        timeout: Option<Duration>,
    ) -> CommandOutput {
        if result.completed() && self.registry.remove_if_same(session) {
            debug!(
                session_id = %session.id(),
                reason = %result.return_reason,
                "session evicted"
            );
        }
        let hint = hint_for(&result, timeout);
        CommandOutput { result, hint }
    }

    /// A session that failed because its process is already gone is of no
    /// further use.
    fn evict_on_error(&self, session: &Arc<ProcessSession>, err: ProcessError) -> ExecError {
        if session.state().is_terminal() && self.registry.remove_if_same(session) {
            debug!(session_id = %session.id(), "stale session evicted");
        }
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_exec_core::OutputLimits;

    fn executor() -> CommandExecutor {
        CommandExecutor::new(
            EngineConfig::default()
                .with_default_limits(OutputLimits::unbounded())
                .with_soft_timeout(Duration::from_millis(500)),
        )
    }

    #[tokio::test]
    async fn test_empty_command_is_invalid_input() {
        let err = executor().execute(ExecuteInput::new("   ")).await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_blank_session_id_is_invalid_input() {
        let exec = executor();
        let err = exec
            .execute(ExecuteInput::new("true").with_session_id(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidInput(_)));

        let err = exec.resume(ResumeInput::new("")).await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_running() {
        let exec = executor();
        let err = exec.terminate(TerminateInput::new("ghost")).await.unwrap_err();
        assert!(matches!(
            err,
            ExecError::Process(ProcessError::NotRunning(ref id)) if id == "ghost"
        ));
        assert!(exec.peek("ghost").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generated_session_id_and_eviction() {
        let exec = executor();
        let output = exec.execute(ExecuteInput::new("echo hi")).await.unwrap();

        assert_eq!(output.result.session_id.len(), 8);
        assert_eq!(output.result.output, "hi\n");
        assert!(exec.registry().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_terminates_live_sessions() {
        let exec = executor();
        let output = exec
            .execute(
                ExecuteInput::new("sleep 30")
                    .with_session_id("long")
                    .with_timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap();
        assert!(!output.result.completed());
        assert_eq!(exec.sessions().len(), 1);

        assert_eq!(exec.shutdown().await, 1);
        assert!(exec.registry().is_empty());
    }
}
