//! Semantic error codes for JSON-RPC domain errors.
//!
//! Error codes follow the JSON-RPC 2.0 specification:
//! - -32700 to -32600: Reserved protocol errors
//! - -32000 to -32099: Server errors (we use -32001 to -32010 for domain errors)

// Protocol errors
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

// Session-related errors
pub const SESSION_NOT_RUNNING: i32 = -32001;
pub const SESSION_ALREADY_RUNNING: i32 = -32002;
pub const SESSION_FINISHED: i32 = -32003;
pub const SESSION_LIMIT: i32 = -32006;

// Input errors
pub const INVALID_INPUT: i32 = -32005;

// Process errors
pub const SPAWN_FAILED: i32 = -32008;
pub const SIGNAL_FAILED: i32 = -32009;

// Legacy generic error (for backwards compatibility)
pub const GENERIC_ERROR: i32 = -32000;

/// Error category for programmatic handling by AI agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Resource not found (session, process)
    NotFound,
    /// Invalid input parameters
    InvalidInput,
    /// Resource busy or at capacity
    Busy,
    /// Internal server error
    Internal,
    /// External dependency failure (OS process, signals)
    External,
    /// Operation timed out
    Timeout,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Busy => "busy",
            ErrorCategory::Internal => "internal",
            ErrorCategory::External => "external",
            ErrorCategory::Timeout => "timeout",
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_found" => Ok(ErrorCategory::NotFound),
            "invalid_input" => Ok(ErrorCategory::InvalidInput),
            "busy" => Ok(ErrorCategory::Busy),
            "internal" => Ok(ErrorCategory::Internal),
            "external" => Ok(ErrorCategory::External),
            "timeout" => Ok(ErrorCategory::Timeout),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns whether an error code represents a retriable operation.
///
/// A full registry frees up as soon as any session finishes, so a later
/// attempt may succeed.
pub fn is_retryable(code: i32) -> bool {
    matches!(code, SESSION_LIMIT | GENERIC_ERROR)
}

/// Returns the error category for a given error code.
pub fn category_for_code(code: i32) -> ErrorCategory {
    match code {
        SESSION_NOT_RUNNING | SESSION_FINISHED => ErrorCategory::NotFound,
        INVALID_INPUT | INVALID_PARAMS | INVALID_REQUEST | PARSE_ERROR | METHOD_NOT_FOUND => {
            ErrorCategory::InvalidInput
        }
        SESSION_ALREADY_RUNNING | SESSION_LIMIT => ErrorCategory::Busy,
        SPAWN_FAILED | SIGNAL_FAILED => ErrorCategory::External,
        _ => ErrorCategory::Internal,
    }
}
