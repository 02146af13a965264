use std::fmt;

use crate::output::OutputMeter;

const BYTES_PER_TOKEN: usize = 4;

/// Rough token count for `bytes` of output, rounded up.
pub fn estimate_tokens(bytes: usize) -> usize {
    bytes.div_ceil(BYTES_PER_TOKEN)
}

/// Which cap stopped a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Lines,
    Tokens,
    Bytes,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::Lines => "lines",
            LimitKind::Tokens => "tokens",
            LimitKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional output caps. `None` leaves that dimension unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputLimits {
    pub max_lines: Option<usize>,
    pub max_tokens: Option<usize>,
    pub max_bytes: Option<usize>,
}

impl OutputLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_lines(mut self, max: usize) -> Self {
        self.max_lines = Some(max);
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = Some(max);
        self
    }

    /// Fill every unset cap from `defaults`.
    pub fn or(self, defaults: OutputLimits) -> Self {
        Self {
            max_lines: self.max_lines.or(defaults.max_lines),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
            max_bytes: self.max_bytes.or(defaults.max_bytes),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_lines.is_none() && self.max_tokens.is_none() && self.max_bytes.is_none()
    }
}

/// Decides whether accumulated output has reached a cap.
///
/// A cap is reached when the measured value is greater than or equal to it.
/// Lines count non-empty lines only, so a trailing partial line counts and
/// blank lines do not. When several caps are reached at once the first in
/// lines, tokens, bytes order is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputLimiter {
    limits: OutputLimits,
}

impl OutputLimiter {
    pub fn new(limits: OutputLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> OutputLimits {
        self.limits
    }

    pub fn should_stop(&self, output: impl AsRef<[u8]>) -> bool {
        self.exceeded(output).is_some()
    }

    pub fn exceeded(&self, output: impl AsRef<[u8]>) -> Option<LimitKind> {
        if self.limits.is_unbounded() {
            return None;
        }
        self.check(&OutputMeter::measure(output.as_ref()))
    }

    /// Same verdict as [`exceeded`](Self::exceeded) from an incrementally
    /// maintained meter, without rescanning the output.
    pub fn check(&self, meter: &OutputMeter) -> Option<LimitKind> {
        let limits = &self.limits;
        if limits.max_lines.is_some_and(|max| meter.lines() >= max) {
            return Some(LimitKind::Lines);
        }
        if limits
            .max_tokens
            .is_some_and(|max| meter.estimated_tokens() >= max)
        {
            return Some(LimitKind::Tokens);
        }
        if limits.max_bytes.is_some_and(|max| meter.bytes() >= max) {
            return Some(LimitKind::Bytes);
        }
        None
    }
}
