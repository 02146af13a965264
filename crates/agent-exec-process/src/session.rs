use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use agent_exec_common::mutex_lock_or_recover;
use agent_exec_core::{
    ExecutionResult, NO_EXIT_CODE, OutputBuffer, OutputLimiter, OutputLimits, ProcessState,
    ReturnReason, SessionId,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::child::{ChildHandle, OutputSink, wait_for_exit};
use crate::error::ProcessError;
use crate::shutdown::{ProcessControl, REAP_TIMEOUT, StopSignal, escalate};

#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub limits: OutputLimits,
}

#[derive(Debug, Clone)]
pub struct ResumeRequest {
    /// Written verbatim. Without a trailing newline stdin is closed after.
    pub stdin: Option<String>,
    pub timeout: Duration,
    pub limits: OutputLimits,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: SessionId,
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub pid: Option<u32>,
    pub state: ProcessState,
    pub started_at: Option<DateTime<Utc>>,
    pub output_bytes: usize,
}

#[derive(Debug, Clone, Copy)]
enum WaitOutcome {
    Exited(i32),
    LimitReached,
    TimedOut,
}

struct SessionCore {
    state: ProcessState,
    command: String,
    cwd: Option<PathBuf>,
    pid: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    output: OutputBuffer,
    limiter: OutputLimiter,
    exit_code: Option<i32>,
}

/// State shared with the pipe readers.
struct Capture {
    id: SessionId,
    core: Mutex<SessionCore>,
    limit_hit: watch::Sender<bool>,
    /// Kill switch for the current process. Weak so that dropping the
    /// handle still kills the process.
    stopper: Mutex<Option<mpsc::WeakUnboundedSender<StopSignal>>>,
}

impl Capture {
    fn stop(&self) {
        let signals = mutex_lock_or_recover(&self.stopper)
            .as_ref()
            .and_then(mpsc::WeakUnboundedSender::upgrade);
        if let Some(signals) = signals {
            if signals.send(StopSignal::Kill).is_err() {
                debug!(session_id = %self.id, "process monitor already stopped");
            }
        }
    }
}

impl OutputSink for Capture {
    fn accept(&self, chunk: &[u8]) {
        let hit = {
            let mut core = mutex_lock_or_recover(&self.core);
            let limiter = core.limiter;
            let hit = core.output.append_limited(chunk, &limiter);
            if hit.is_some() && core.state == ProcessState::TimedOut {
                // No call is waiting, so the cap is settled here.
                core.state = ProcessState::LimitExceeded;
                core.exit_code = Some(NO_EXIT_CODE);
            }
            hit
        };
        if let Some(kind) = hit {
            debug!(session_id = %self.id, limit = %kind, "output cap reached, killing process");
            self.limit_hit.send_replace(true);
            self.stop();
        }
    }
}

/// One logical command: at most one OS process, one output buffer.
///
/// `execute` and `resume` block until the process exits, an output cap is
/// reached, or the timeout elapses. A timeout leaves the process running
/// for a later `resume` or `terminate`.
///
/// Output captured after a cap is reached but before the kill lands is
/// dropped, except for the chunk that tripped the cap, so a result can
/// exceed a cap by at most one read (4 KiB).
pub struct ProcessSession {
    id: SessionId,
    capture: Arc<Capture>,
    process: AsyncMutex<Option<ChildHandle>>,
}

impl ProcessSession {
    pub fn new(id: SessionId) -> Self {
        let (limit_hit, _) = watch::channel(false);
        let core = SessionCore {
            state: ProcessState::Idle,
            command: String::new(),
            cwd: None,
            pid: None,
            started_at: None,
            output: OutputBuffer::new(),
            limiter: OutputLimiter::default(),
            exit_code: None,
        };
        Self {
            capture: Arc::new(Capture {
                id: id.clone(),
                core: Mutex::new(core),
                limit_hit,
                stopper: Mutex::new(None),
            }),
            id,
            process: AsyncMutex::new(None),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> ProcessState {
        self.lock_core().state
    }

    pub fn info(&self) -> SessionInfo {
        let core = self.lock_core();
        SessionInfo {
            id: self.id.clone(),
            command: core.command.clone(),
            cwd: core.cwd.clone(),
            pid: core.pid,
            state: core.state,
            started_at: core.started_at,
            output_bytes: core.output.len(),
        }
    }

    /// Current output and status without waiting. A live process reports
    /// `stillRunning`.
    pub fn snapshot(&self) -> ExecutionResult {
        let core = self.lock_core();
        let reason = if core.state.holds_process() || core.state == ProcessState::Idle {
            ReturnReason::StillRunning
        } else {
            core.state.return_reason()
        };
        self.result_with(&core, reason)
    }

    pub async fn execute(&self, request: ExecRequest) -> Result<ExecutionResult, ProcessError> {
        self.claim(&request)?;

        let sink: Arc<dyn OutputSink> = self.capture.clone();
        let mut slot = self.process.lock().await;
        let handle = match ChildHandle::spawn(&request.command, request.cwd.as_deref(), sink) {
            Ok(handle) => handle,
            Err(err) => {
                let mut core = self.lock_core();
                core.state = ProcessState::Failed;
                core.exit_code = Some(NO_EXIT_CODE);
                core.output.seal();
                warn!(session_id = %self.id, error = %err, "failed to start process");
                return Err(err);
            }
        };

        self.lock_core().pid = handle.pid();
        *mutex_lock_or_recover(&self.capture.stopper) = Some(handle.weak_signals());
        info!(
            session_id = %self.id,
            pid = ?handle.pid(),
            command = %request.command,
            "process started"
        );

        let exit = handle.exit_watch();
        *slot = Some(handle);
        drop(slot);

        Ok(self.wait_outcome(exit, request.timeout).await)
    }

    /// Continue waiting on a live process, optionally feeding it stdin.
    /// The new caps replace the old ones and apply to the whole buffer.
    pub async fn resume(&self, request: ResumeRequest) -> Result<ExecutionResult, ProcessError> {
        let stopped_by_cap = {
            let mut core = self.lock_core();
            match core.state {
                state if state.holds_process() => {
                    core.state = ProcessState::Running;
                    core.limiter = OutputLimiter::new(request.limits);
                    if let Some(kind) = core.limiter.check(core.output.meter()) {
                        debug!(session_id = %self.id, limit = %kind, "buffered output already over cap");
                        core.output.seal();
                        self.capture.limit_hit.send_replace(true);
                    }
                    false
                }
                ProcessState::LimitExceeded => true,
                _ => return Err(ProcessError::NotRunning(self.id.to_string())),
            }
        };

        if stopped_by_cap {
            // Killed while nobody was waiting; this call reports it.
            if !self.kill().await {
                return Err(ProcessError::NotRunning(self.id.to_string()));
            }
            let core = self.lock_core();
            return Ok(self.result_with(&core, ReturnReason::MaxOutput));
        }

        let deadline = Instant::now() + request.timeout;
        let (exit, flushed) = {
            let mut slot = self.process.lock().await;
            let Some(handle) = slot.as_mut() else {
                return Err(ProcessError::NotRunning(self.id.to_string()));
            };
            let flushed = match request.stdin.as_deref().map(|input| handle.write_stdin(input)) {
                Some(Ok(flushed)) => Some(flushed),
                Some(Err(e)) => {
                    warn!(session_id = %self.id, error = %e, "failed to write stdin");
                    None
                }
                None => None,
            };
            (handle.exit_watch(), flushed)
        };

        // Wait for the child to take the input, but never past the timeout
        // or a cap. The process lock is released, so terminate is not held
        // up. A dead child makes the writer give up.
        if let Some(flushed) = flushed {
            let mut limit_hit = self.capture.limit_hit.subscribe();
            tokio::select! {
                written = flushed => match written {
                    Ok(()) => debug!(session_id = %self.id, "stdin flushed"),
                    Err(_) => debug!(session_id = %self.id, "stdin writer stopped before flushing"),
                },
                true = wait_for_limit(&mut limit_hit) => {}
                _ = tokio::time::sleep_until(deadline) => {
                    debug!(session_id = %self.id, "stdin not drained before timeout");
                }
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        Ok(self.wait_outcome(exit, remaining).await)
    }

    /// SIGTERM, wait up to `soft_timeout`, then SIGKILL. Always ends in
    /// `Terminated` with the process handle released.
    pub async fn terminate(&self, soft_timeout: Duration) -> Result<ExecutionResult, ProcessError> {
        let handle = self.process.lock().await.take();
        let Some(mut handle) = handle else {
            return Err(ProcessError::NotRunning(self.id.to_string()));
        };

        // A concurrent execute or resume that sees the exit must report it
        // as terminated, not completed.
        self.lock_core().state = ProcessState::Terminated;
        info!(session_id = %self.id, pid = ?handle.pid(), "terminating process");
        let outcome = escalate(&mut handle, soft_timeout).await;
        drop(handle);

        let mut core = self.lock_core();
        core.state = ProcessState::Terminated;
        core.exit_code = Some(outcome.exit_code());
        core.output.seal();
        info!(session_id = %self.id, outcome = ?outcome, "process terminated");
        Ok(self.result_with(&core, ReturnReason::Terminated))
    }

    fn claim(&self, request: &ExecRequest) -> Result<(), ProcessError> {
        let mut core = self.lock_core();
        match core.state {
            ProcessState::Idle => {}
            state if state.holds_process() => {
                return Err(ProcessError::AlreadyRunning(self.id.to_string()));
            }
            _ => return Err(ProcessError::Finished(self.id.to_string())),
        }
        core.state = ProcessState::Running;
        core.command = request.command.clone();
        core.cwd = request.cwd.clone();
        core.started_at = Some(Utc::now());
        core.limiter = OutputLimiter::new(request.limits);
        Ok(())
    }

    async fn wait_outcome(
        &self,
        mut exit: watch::Receiver<Option<i32>>,
        timeout: Duration,
    ) -> ExecutionResult {
        let mut limit_hit = self.capture.limit_hit.subscribe();

        // Limit first: a fast process can trip the cap and exit before we
        // get here, and that must still read as maxOutput.
        let outcome = tokio::select! {
            biased;
            true = wait_for_limit(&mut limit_hit) => WaitOutcome::LimitReached,
            code = wait_for_exit(&mut exit) => WaitOutcome::Exited(code),
            _ = tokio::time::sleep(timeout) => WaitOutcome::TimedOut,
        };
        // The cap may trip between the timer firing and settling.
        let outcome = match outcome {
            WaitOutcome::TimedOut if *limit_hit.borrow() => WaitOutcome::LimitReached,
            other => other,
        };

        self.settle(outcome).await
    }

    async fn settle(&self, outcome: WaitOutcome) -> ExecutionResult {
        {
            let mut core = self.lock_core();
            if core.state.is_terminal() {
                // terminate() got there first
                let reason = core.state.return_reason();
                return self.result_with(&core, reason);
            }
            match outcome {
                WaitOutcome::Exited(code) => {
                    core.state = ProcessState::Completed;
                    core.exit_code = Some(code);
                    core.output.seal();
                    info!(session_id = %self.id, exit_code = code, "process completed");
                }
                WaitOutcome::LimitReached => {
                    core.state = ProcessState::LimitExceeded;
                    core.exit_code = Some(NO_EXIT_CODE);
                    core.output.seal();
                    info!(
                        session_id = %self.id,
                        bytes = core.output.len(),
                        "output cap reached, stopping process"
                    );
                }
                WaitOutcome::TimedOut => {
                    core.state = ProcessState::TimedOut;
                    debug!(session_id = %self.id, "wait timed out, process left running");
                }
            }
        }

        match outcome {
            WaitOutcome::Exited(_) => {
                self.process.lock().await.take();
            }
            WaitOutcome::LimitReached => {
                self.kill().await;
            }
            WaitOutcome::TimedOut => {}
        }

        let core = self.lock_core();
        self.result_with(&core, core.state.return_reason())
    }

    /// Kill and reap the process. False if another call already took it.
    async fn kill(&self) -> bool {
        let handle = self.process.lock().await.take();
        let Some(mut handle) = handle else {
            return false;
        };
        if let Err(e) = handle.signal(StopSignal::Kill) {
            debug!(session_id = %self.id, error = %e, "kill not delivered");
        }
        if tokio::time::timeout(REAP_TIMEOUT, handle.wait())
            .await
            .is_err()
        {
            warn!(session_id = %self.id, "process did not exit after SIGKILL");
        }
        true
    }

    fn result_with(&self, core: &SessionCore, reason: ReturnReason) -> ExecutionResult {
        ExecutionResult::new(
            self.id.clone(),
            core.output.text(),
            core.exit_code.unwrap_or(NO_EXIT_CODE),
            reason,
        )
    }

    fn lock_core(&self) -> MutexGuard<'_, SessionCore> {
        mutex_lock_or_recover(&self.capture.core)
    }
}

/// False only if the sender is gone, which cannot happen while the
/// session is alive.
async fn wait_for_limit(limit_hit: &mut watch::Receiver<bool>) -> bool {
    limit_hit.wait_for(|hit| *hit).await.is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn exec(command: &str, timeout_ms: u64) -> ExecRequest {
        ExecRequest {
            command: command.to_string(),
            cwd: None,
            timeout: Duration::from_millis(timeout_ms),
            limits: OutputLimits::unbounded(),
        }
    }

    fn resume(stdin: Option<&str>, timeout_ms: u64) -> ResumeRequest {
        ResumeRequest {
            stdin: stdin.map(String::from),
            timeout: Duration::from_millis(timeout_ms),
            limits: OutputLimits::unbounded(),
        }
    }

    fn session() -> ProcessSession {
        ProcessSession::new(SessionId::new("test"))
    }

    #[tokio::test]
    async fn test_echo_completes() {
        let session = session();
        let result = session.execute(exec("echo hello", 5000)).await.unwrap();

        assert_eq!(result.output, "hello\n");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.return_reason, ReturnReason::Completed);
        assert!(result.completed());
        assert_eq!(session.state(), ProcessState::Completed);
    }

    #[tokio::test]
    async fn test_nonzero_exit_and_stderr() {
        let session = session();
        let result = session
            .execute(exec("echo oops 1>&2; exit 3", 5000))
            .await
            .unwrap();

        assert_eq!(result.exit_code, 3);
        assert_eq!(result.output, "oops\n");
        assert_eq!(result.return_reason, ReturnReason::Completed);
    }

    #[tokio::test]
    async fn test_timeout_leaves_process_alive_until_terminate() {
        let session = session();
        let result = session.execute(exec("sleep 10", 300)).await.unwrap();

        assert_eq!(result.return_reason, ReturnReason::Timeout);
        assert!(!result.completed());
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert_eq!(session.state(), ProcessState::TimedOut);
        assert!(session.info().pid.is_some());

        let result = session.terminate(Duration::from_secs(3)).await.unwrap();
        assert_eq!(result.return_reason, ReturnReason::Terminated);
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert_eq!(session.state(), ProcessState::Terminated);
    }

    #[tokio::test]
    async fn test_resume_writes_stdin_and_appends_output() {
        let session = session();
        let first = session
            .execute(exec("echo 'continue?'; read answer; echo \"got $answer\"", 300))
            .await
            .unwrap();
        assert_eq!(first.return_reason, ReturnReason::Timeout);
        assert_eq!(first.output, "continue?\n");

        let second = session.resume(resume(Some("yes\n"), 5000)).await.unwrap();
        assert_eq!(second.return_reason, ReturnReason::Completed);
        assert_eq!(second.exit_code, 0);
        assert!(second.output.starts_with(&first.output));
        assert_eq!(second.output, "continue?\ngot yes\n");
    }

    #[tokio::test]
    async fn test_resume_without_newline_closes_stdin() {
        let session = session();
        let first = session.execute(exec("cat", 200)).await.unwrap();
        assert_eq!(first.return_reason, ReturnReason::Timeout);

        let second = session.resume(resume(Some("abc"), 5000)).await.unwrap();
        assert_eq!(second.return_reason, ReturnReason::Completed);
        assert_eq!(second.output, "abc");
    }

    #[tokio::test]
    async fn test_second_execute_fails_while_running() {
        let session = session();
        let first = session.execute(exec("sleep 10", 200)).await.unwrap();
        assert_eq!(first.return_reason, ReturnReason::Timeout);
        let pid = session.info().pid;

        let err = session.execute(exec("echo other", 1000)).await.unwrap_err();
        assert!(matches!(err, ProcessError::AlreadyRunning(_)));
        assert_eq!(session.info().pid, pid);
        assert_eq!(session.info().command, "sleep 10");

        session.terminate(Duration::from_secs(3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_after_completion_fails() {
        let session = session();
        session.execute(exec("true", 5000)).await.unwrap();
        let err = session.execute(exec("true", 5000)).await.unwrap_err();
        assert!(matches!(err, ProcessError::Finished(_)));
    }

    #[tokio::test]
    async fn test_line_cap_kills_process() {
        let session = session();
        let mut request = exec("yes line", 10_000);
        request.limits = OutputLimits::unbounded().with_max_lines(10);

        let start = Instant::now();
        let result = session.execute(request).await.unwrap();

        assert_eq!(result.return_reason, ReturnReason::MaxOutput);
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert!(result.completed());
        assert!(start.elapsed() < Duration::from_secs(5));

        let lines = result.output.lines().filter(|l| !l.is_empty()).count();
        assert!(lines >= 10);
        assert!(result.output.len() < 10 * "line\n".len() + crate::child::READ_CHUNK_BYTES);
        assert_eq!(session.state(), ProcessState::LimitExceeded);

        let err = session.terminate(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_byte_cap_on_finite_output() {
        let session = session();
        let mut request = exec("printf 'aaaaaaaaaaaaaaaaaaaa'", 5000);
        request.limits = OutputLimits::unbounded().with_max_bytes(8);

        let result = session.execute(request).await.unwrap();
        assert_eq!(result.return_reason, ReturnReason::MaxOutput);
        assert!(result.output.len() >= 8);
    }

    #[tokio::test]
    async fn test_terminate_escalates_when_sigterm_ignored() {
        let session = session();
        let result = session
            .execute(exec("trap '' TERM; sleep 30", 200))
            .await
            .unwrap();
        assert_eq!(result.return_reason, ReturnReason::Timeout);

        let grace = Duration::from_millis(300);
        let start = Instant::now();
        let result = session.terminate(grace).await.unwrap();

        assert!(start.elapsed() >= grace);
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(result.return_reason, ReturnReason::Terminated);
        assert_eq!(session.state(), ProcessState::Terminated);
    }

    #[tokio::test]
    async fn test_terminate_does_not_wait_when_sigterm_honoured() {
        let session = session();
        session.execute(exec("sleep 30", 200)).await.unwrap();

        let start = Instant::now();
        let result = session.terminate(Duration::from_secs(5)).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(result.return_reason, ReturnReason::Terminated);
    }

    #[tokio::test]
    async fn test_terminate_and_resume_on_idle_fail() {
        let session = session();
        let err = session.terminate(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotRunning(_)));

        let err = session.resume(resume(None, 100)).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_resume_after_completion_fails() {
        let session = session();
        session.execute(exec("echo done", 5000)).await.unwrap();
        let err = session.resume(resume(Some("x\n"), 100)).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_resume_observes_exit_that_happened_in_background() {
        let session = session();
        let first = session
            .execute(exec("sleep 0.3; echo late", 50))
            .await
            .unwrap();
        assert_eq!(first.return_reason, ReturnReason::Timeout);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let second = session.resume(resume(None, 5000)).await.unwrap();
        assert_eq!(second.return_reason, ReturnReason::Completed);
        assert_eq!(second.output, "late\n");
    }

    #[tokio::test]
    async fn test_spawn_failure_marks_session_failed() {
        let session = session();
        let mut request = exec("echo hi", 1000);
        request.cwd = Some(PathBuf::from("/definitely/not/a/real/dir"));

        let err = session.execute(request).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert_eq!(session.state(), ProcessState::Failed);
    }

    #[tokio::test]
    async fn test_runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let session = session();
        let mut request = exec("pwd", 5000);
        request.cwd = Some(dir.path().to_path_buf());

        let result = session.execute(request).await.unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let actual = PathBuf::from(result.output.trim()).canonicalize().unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_large_stdin_to_non_reader_keeps_timeout() {
        let session = Arc::new(session());
        session.execute(exec("sleep 30", 200)).await.unwrap();

        let input = format!("{}\n", "x".repeat(1_000_000));
        let start = Instant::now();
        let result = session.resume(resume(Some(&input), 500)).await.unwrap();
        assert_eq!(result.return_reason, ReturnReason::Timeout);
        assert!(start.elapsed() < Duration::from_secs(3));

        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.resume(resume(Some(&input), 10_000)).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let result = tokio::time::timeout(
            Duration::from_secs(8),
            session.terminate(Duration::from_secs(1)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(result.return_reason, ReturnReason::Terminated);

        let pending = tokio::time::timeout(Duration::from_secs(5), pending)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(pending.return_reason, ReturnReason::Terminated);
    }

    #[tokio::test]
    async fn test_cap_reached_while_nobody_waits_kills_process() {
        let session = session();
        let mut request = exec("sleep 0.5; yes", 200);
        request.limits = OutputLimits::unbounded().with_max_lines(10);
        let first = session.execute(request).await.unwrap();
        assert_eq!(first.return_reason, ReturnReason::Timeout);
        let pid = session.info().pid.unwrap() as libc::pid_t;

        let deadline = Instant::now() + Duration::from_secs(5);
        // SAFETY: signal 0 only probes whether the process exists.
        while unsafe { libc::kill(pid, 0) } == 0 {
            assert!(Instant::now() < deadline, "process still alive");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let captured = session.info().output_bytes;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(session.info().output_bytes, captured);

        assert_eq!(session.state(), ProcessState::LimitExceeded);
        assert_eq!(session.snapshot().return_reason, ReturnReason::MaxOutput);

        let result = session.resume(resume(None, 5000)).await.unwrap();
        assert_eq!(result.return_reason, ReturnReason::MaxOutput);
        assert_eq!(result.exit_code, NO_EXIT_CODE);
        assert!(result.output.len() < 10 * "y\n".len() + crate::child::READ_CHUNK_BYTES);

        let err = session.resume(resume(None, 100)).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_resume_cap_applies_to_buffered_output() {
        let session = session();
        let first = session
            .execute(exec("seq 1 20; sleep 30", 300))
            .await
            .unwrap();
        assert_eq!(first.return_reason, ReturnReason::Timeout);

        let mut request = resume(None, 10_000);
        request.limits = OutputLimits::unbounded().with_max_lines(5);
        let start = Instant::now();
        let result = session.resume(request).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(result.return_reason, ReturnReason::MaxOutput);
        assert_eq!(result.output, first.output);
        assert_eq!(session.state(), ProcessState::LimitExceeded);
    }

    #[tokio::test]
    async fn test_snapshot_reports_still_running() {
        let session = session();
        session.execute(exec("echo first; sleep 10", 300)).await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.return_reason, ReturnReason::StillRunning);
        assert_eq!(snapshot.output, "first\n");

        session.terminate(Duration::from_secs(3)).await.unwrap();
        assert_eq!(session.snapshot().return_reason, ReturnReason::Terminated);
    }
}
