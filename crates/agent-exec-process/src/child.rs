//! Spawning a shell command and owning the resulting OS process.
//!
//! The child lives inside a monitor task. Everything else talks to it
//! through a [`ChildHandle`]: signals and stdin go in over channels, the
//! exit code comes out through a watch. Dropping the handle kills the
//! process group.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use agent_exec_core::NO_EXIT_CODE;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ProcessError;
use crate::shutdown::{ProcessControl, StopSignal};

pub(crate) const READ_CHUNK_BYTES: usize = 4096;

/// How long pipe readers may keep draining after the process exits.
/// Background grandchildren can hold the pipes open indefinitely.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Receives output chunks from the pipe readers in arrival order.
pub(crate) trait OutputSink: Send + Sync + 'static {
    fn accept(&self, chunk: &[u8]);
}

/// Input for the writer task and the channel that reports its flush.
type StdinWrite = (String, oneshot::Sender<()>);

pub(crate) struct ChildHandle {
    pid: Option<u32>,
    /// Queue into the stdin writer task. `None` once stdin is closed.
    stdin: Option<mpsc::UnboundedSender<StdinWrite>>,
    signals: mpsc::UnboundedSender<StopSignal>,
    exit: watch::Receiver<Option<i32>>,
}

impl ChildHandle {
    /// Start `command` under the platform shell with all three pipes
    /// attached, in a new process group on unix.
    pub(crate) fn spawn(
        command: &str,
        cwd: Option<&Path>,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, ProcessError> {
        let mut cmd = shell_command(command);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        let pid = child.id();
        let (stdin, writer) = match child.stdin.take() {
            Some(pipe) => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Some(tx), Some(tokio::spawn(feed_stdin(pipe, rx))))
            }
            None => (None, None),
        };

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump(stdout, Arc::clone(&sink))));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump(stderr, sink)));
        }

        let (signals, signal_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit) = watch::channel(None);
        tokio::spawn(monitor(child, signal_rx, exit_tx, readers, writer));

        Ok(Self {
            pid,
            stdin,
            signals,
            exit,
        })
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn exit_watch(&self) -> watch::Receiver<Option<i32>> {
        self.exit.clone()
    }

    /// Queue `input` for the child's stdin without waiting for the child to
    /// read it. The returned receiver resolves once the input is flushed and
    /// errors if the writer gives up. Input without a trailing newline also
    /// closes stdin once written, which the child sees as end of input.
    pub(crate) fn write_stdin(&mut self, input: &str) -> io::Result<oneshot::Receiver<()>> {
        let Some(stdin) = self.stdin.as_ref() else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin is closed"));
        };

        let (flushed, receiver) = oneshot::channel();
        let queued = stdin.send((input.to_string(), flushed));
        if queued.is_err() || !input.ends_with('\n') {
            self.stdin = None;
        }
        queued
            .map(|()| receiver)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stdin writer has stopped"))
    }

    /// A sender that does not keep the process alive. Signals sent through
    /// it are dropped once the handle is gone.
    pub(crate) fn weak_signals(&self) -> mpsc::WeakUnboundedSender<StopSignal> {
        self.signals.downgrade()
    }
}

#[async_trait]
impl ProcessControl for ChildHandle {
    fn exit_code(&self) -> Option<i32> {
        *self.exit.borrow()
    }

    fn signal(&mut self, signal: StopSignal) -> Result<(), ProcessError> {
        self.signals
            .send(signal)
            .map_err(|_| ProcessError::Signal {
                signal: signal.as_str(),
                reason: "process monitor has already stopped".to_string(),
            })
    }

    async fn wait(&mut self) -> i32 {
        wait_for_exit(&mut self.exit).await
    }
}

pub(crate) async fn wait_for_exit(exit: &mut watch::Receiver<Option<i32>>) -> i32 {
    match exit.wait_for(Option::is_some).await {
        Ok(code) => (*code).unwrap_or(NO_EXIT_CODE),
        Err(_) => NO_EXIT_CODE,
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

async fn pump<R>(mut pipe: R, sink: Arc<dyn OutputSink>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink.accept(&buf[..n]),
            Err(e) => {
                debug!(error = %e, "pipe read failed");
                break;
            }
        }
    }
}

/// Writes queued input in order. Ends when the queue closes or the child
/// stops reading, dropping the pipe either way.
async fn feed_stdin(mut pipe: ChildStdin, mut queue: mpsc::UnboundedReceiver<StdinWrite>) {
    while let Some((input, flushed)) = queue.recv().await {
        let written = async {
            pipe.write_all(input.as_bytes()).await?;
            pipe.flush().await
        }
        .await;
        match written {
            Ok(()) => {
                debug!(bytes = input.len(), "stdin written");
                let _ = flushed.send(());
            }
            Err(e) => {
                debug!(error = %e, "stdin write failed, closing stdin");
                break;
            }
        }
    }
}

async fn monitor(
    mut child: Child,
    mut signals: mpsc::UnboundedReceiver<StopSignal>,
    exit_tx: watch::Sender<Option<i32>>,
    readers: Vec<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
) {
    let pid = child.id();
    let mut handle_alive = true;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            signal = signals.recv(), if handle_alive => match signal {
                Some(signal) => deliver(&mut child, signal),
                None => {
                    handle_alive = false;
                    debug!(pid = ?pid, "process handle dropped, killing process");
                    deliver(&mut child, StopSignal::Kill);
                }
            },
        }
    };

    let code = match status {
        Ok(status) => status.code().unwrap_or(NO_EXIT_CODE),
        Err(e) => {
            warn!(pid = ?pid, error = %e, "failed to wait for process");
            NO_EXIT_CODE
        }
    };

    // A grandchild may still hold stdin open and never read it.
    if let Some(writer) = writer {
        writer.abort();
    }
    drain(readers).await;
    debug!(pid = ?pid, exit_code = code, "process exited");
    exit_tx.send_replace(Some(code));
}

async fn drain(readers: Vec<JoinHandle<()>>) {
    let aborts: Vec<_> = readers.iter().map(JoinHandle::abort_handle).collect();
    let joined = tokio::time::timeout(DRAIN_TIMEOUT, async {
        for reader in readers {
            let _ = reader.await;
        }
    })
    .await;

    if joined.is_err() {
        debug!("pipes still open after exit, abandoning readers");
        for abort in aborts {
            abort.abort();
        }
    }
}

#[cfg(unix)]
fn deliver(child: &mut Child, signal: StopSignal) {
    let Some(pid) = child.id().and_then(|id| libc::pid_t::try_from(id).ok()) else {
        debug!(signal = signal.as_str(), "process already reaped, signal skipped");
        return;
    };

    // SAFETY: kill(2) has no memory-safety preconditions. The child was
    // spawned as a group leader, so its pid is also its process group id.
    let rc = unsafe { libc::kill(-pid, signal.as_raw()) };
    if rc == 0 {
        debug!(pid, signal = signal.as_str(), "signalled process group");
        return;
    }

    debug!(
        pid,
        signal = signal.as_str(),
        error = %io::Error::last_os_error(),
        "group signal failed, signalling leader"
    );
    // SAFETY: as above.
    if unsafe { libc::kill(pid, signal.as_raw()) } != 0 {
        debug!(
            pid,
            error = %io::Error::last_os_error(),
            "signal not delivered, process already gone"
        );
    }
}

#[cfg(not(unix))]
fn deliver(child: &mut Child, signal: StopSignal) {
    if let Err(e) = child.start_kill() {
        debug!(signal = signal.as_str(), error = %e, "kill not delivered");
    }
}
