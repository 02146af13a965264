use std::env;
use std::str::FromStr;
use std::time::Duration;

use agent_exec_core::OutputLimits;

use crate::registry::DEFAULT_MAX_SESSIONS;

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_SOFT_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wait applied to execute and resume when the caller gives none.
    pub command_timeout: Duration,
    /// Grace between SIGTERM and SIGKILL when the caller gives none.
    pub soft_timeout: Duration,
    pub max_sessions: usize,
    /// Per-dimension fallback for caps the caller leaves unset. Unbounded
    /// unless an `AGENT_EXEC_MAX_*` variable sets a dimension.
    pub default_limits: OutputLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Zero is treated as unset.
fn env_cap(key: &str) -> Option<usize> {
    env_parse(key).filter(|&n: &usize| n > 0)
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            command_timeout: Duration::from_secs(
                env_parse("AGENT_EXEC_COMMAND_TIMEOUT").unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            ),
            soft_timeout: Duration::from_millis(
                env_parse("AGENT_EXEC_SOFT_TIMEOUT_MS").unwrap_or(DEFAULT_SOFT_TIMEOUT_MS),
            ),
            max_sessions: env_parse("AGENT_EXEC_MAX_SESSIONS").unwrap_or(DEFAULT_MAX_SESSIONS),
            default_limits: OutputLimits {
                max_lines: env_cap("AGENT_EXEC_MAX_LINES"),
                max_tokens: env_cap("AGENT_EXEC_MAX_TOKENS"),
                max_bytes: env_cap("AGENT_EXEC_MAX_BYTES"),
            },
        }
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_soft_timeout(mut self, timeout: Duration) -> Self {
        self.soft_timeout = timeout;
        self
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn with_default_limits(mut self, limits: OutputLimits) -> Self {
        self.default_limits = limits;
        self
    }
}
