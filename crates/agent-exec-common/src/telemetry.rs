use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub const LOG_FILE_ENV: &str = "AGENT_EXEC_LOG";

/// Keeps the non-blocking log writer alive; drop it last.
#[derive(Debug)]
pub struct TelemetryGuard {
    _guard: Option<WorkerGuard>,
}

/// Where log lines go. Never stdout: `serve` speaks JSON-RPC there.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogDestination {
    Stderr,
    File(PathBuf),
}

impl LogDestination {
    fn from_env() -> Self {
        Self::from_value(std::env::var(LOG_FILE_ENV).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(path) if !path.is_empty() => Self::File(PathBuf::from(path)),
            _ => Self::Stderr,
        }
    }

    /// A file that cannot be opened falls back to stderr with a warning.
    fn writer(&self) -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
        let LogDestination::File(path) = self else {
            return stderr_writer();
        };
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            Err(err) => {
                eprintln!(
                    "agent-exec: cannot open log file {} ({}), logging to stderr",
                    path.display(),
                    err
                );
                stderr_writer()
            }
        }
    }
}

fn stderr_writer() -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
    let ansi = std::io::stderr().is_terminal();
    (BoxMakeWriter::new(std::io::stderr), None, ansi)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level`. Engine threads are
/// tokio workers plus the signal thread, so thread names are logged to
/// tell them apart.
pub fn init_tracing(default_level: &str) -> TelemetryGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let (writer, guard, ansi) = LogDestination::from_env().writer();

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init();

    match installed {
        Ok(()) => TelemetryGuard { _guard: guard },
        // A subscriber is already set (tests, embedding); keep it.
        Err(_) => TelemetryGuard { _guard: None },
    }
}
