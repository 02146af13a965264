#![deny(clippy::all)]

//! Domain layer for the command execution engine.
//!
//! Nothing in here touches the OS or an async runtime: the limiter decides
//! when output must stop, the buffer accumulates it, and the result types
//! describe what a caller gets back.

mod limits;
mod output;
mod result;
mod session_types;

pub use limits::LimitKind;
pub use limits::OutputLimiter;
pub use limits::OutputLimits;
pub use limits::estimate_tokens;
pub use output::OutputBuffer;
pub use output::OutputMeter;
pub use result::ExecutionResult;
pub use result::NO_EXIT_CODE;
pub use result::ReturnReason;
pub use session_types::ProcessState;
pub use session_types::SessionId;
pub use session_types::SessionIdError;
