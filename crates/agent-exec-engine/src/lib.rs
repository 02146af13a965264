#![deny(clippy::all)]

//! Session registry, command execution façade and JSON-RPC server.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod hints;
pub mod registry;
pub mod server;
#[cfg(unix)]
pub mod signal_handler;

pub use config::EngineConfig;
pub use domain::{CommandOutput, ExecuteInput, ResumeInput, TerminateInput};
pub use error::ExecError;
pub use executor::CommandExecutor;
pub use registry::{DEFAULT_MAX_SESSIONS, SessionRegistry, generate_session_id};
pub use server::{run_stdio_server, serve};

pub use agent_exec_core::{ExecutionResult, OutputLimits, ProcessState, ReturnReason};
pub use agent_exec_process::SessionInfo;
