#![deny(clippy::all)]

//! OS process sessions for the command execution engine.
//!
//! A [`ProcessSession`] runs one shell command, captures its stdout and
//! stderr into a bounded buffer, and lets callers come back later to feed
//! stdin or stop it.

mod child;
mod error;
mod session;
mod shutdown;

pub use error::ProcessError;
pub use session::ExecRequest;
pub use session::ProcessSession;
pub use session::ResumeRequest;
pub use session::SessionInfo;
pub use shutdown::ProcessControl;
pub use shutdown::REAP_TIMEOUT;
pub use shutdown::ShutdownOutcome;
pub use shutdown::StopSignal;
pub use shutdown::escalate;
