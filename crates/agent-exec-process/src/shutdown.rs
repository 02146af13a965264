//! Two-phase stop: polite signal, bounded wait, forceful kill.

use std::time::Duration;

use agent_exec_core::NO_EXIT_CODE;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ProcessError;

/// How long to wait for the OS to reap a process after SIGKILL.
pub const REAP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Ask the process to exit (SIGTERM).
    Terminate,
    /// Non-ignorable kill (SIGKILL).
    Kill,
}

impl StopSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopSignal::Terminate => "SIGTERM",
            StopSignal::Kill => "SIGKILL",
        }
    }

    #[cfg(unix)]
    pub(crate) fn as_raw(&self) -> libc::c_int {
        match self {
            StopSignal::Terminate => libc::SIGTERM,
            StopSignal::Kill => libc::SIGKILL,
        }
    }
}

/// The operations the shutdown sequence needs from a running process.
#[async_trait]
pub trait ProcessControl: Send {
    /// Exit code if the process has already exited.
    fn exit_code(&self) -> Option<i32>;

    fn signal(&mut self, signal: StopSignal) -> Result<(), ProcessError>;

    /// Resolves once the process has exited.
    async fn wait(&mut self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Nothing to stop; carries the process's own exit code.
    AlreadyExited(i32),
    /// Exited within the grace period after SIGTERM.
    Graceful,
    /// Needed SIGKILL.
    Forced,
    /// SIGKILL sent but the exit was never observed.
    Unconfirmed,
}

impl ShutdownOutcome {
    pub fn escalated(&self) -> bool {
        matches!(self, ShutdownOutcome::Forced | ShutdownOutcome::Unconfirmed)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownOutcome::AlreadyExited(code) => *code,
            _ => NO_EXIT_CODE,
        }
    }
}

/// Stop `process`, giving it `grace` to honour SIGTERM before SIGKILL.
pub async fn escalate<P>(process: &mut P, grace: Duration) -> ShutdownOutcome
where
    P: ProcessControl + ?Sized,
{
    escalate_with(process, grace, REAP_TIMEOUT).await
}

pub(crate) async fn escalate_with<P>(
    process: &mut P,
    grace: Duration,
    reap_timeout: Duration,
) -> ShutdownOutcome
where
    P: ProcessControl + ?Sized,
{
    if let Some(code) = process.exit_code() {
        return ShutdownOutcome::AlreadyExited(code);
    }

    // A failed signal means the process is already gone; the wait below
    // confirms it.
    if let Err(e) = process.signal(StopSignal::Terminate) {
        debug!(error = %e, "terminate signal not delivered");
    }

    if tokio::time::timeout(grace, process.wait()).await.is_ok() {
        return ShutdownOutcome::Graceful;
    }

    warn!(
        grace_ms = grace.as_millis() as u64,
        "process ignored SIGTERM, escalating to SIGKILL"
    );
    if let Err(e) = process.signal(StopSignal::Kill) {
        debug!(error = %e, "kill signal not delivered");
    }

    match tokio::time::timeout(reap_timeout, process.wait()).await {
        Ok(_) => ShutdownOutcome::Forced,
        Err(_) => {
            warn!("process did not exit after SIGKILL");
            ShutdownOutcome::Unconfirmed
        }
    }
}
