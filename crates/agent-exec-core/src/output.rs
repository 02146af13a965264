use crate::limits::LimitKind;
use crate::limits::OutputLimiter;
use crate::limits::estimate_tokens;

/// Running totals over a byte stream, updated one chunk at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputMeter {
    bytes: usize,
    lines: usize,
    in_line: bool,
}

impl OutputMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure(output: &[u8]) -> Self {
        let mut meter = Self::new();
        meter.record(output);
        meter
    }

    /// A line is counted when its first non-newline byte arrives, so a line
    /// split across chunks is counted once.
    pub fn record(&mut self, chunk: &[u8]) {
        self.bytes += chunk.len();
        for &byte in chunk {
            if byte == b'\n' {
                self.in_line = false;
            } else if !self.in_line {
                self.in_line = true;
                self.lines += 1;
            }
        }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(self.bytes)
    }
}

/// Append-only capture of a process's interleaved stdout and stderr.
///
/// Sealing stops accumulation for good; later chunks are dropped. Bytes are
/// kept raw and decoded on read so a chunk boundary inside a multi-byte
/// character does not corrupt the text.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    meter: OutputMeter,
    sealed: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the buffer is sealed and the chunk was dropped.
    pub fn append(&mut self, chunk: &[u8]) -> bool {
        if self.sealed {
            return false;
        }
        self.bytes.extend_from_slice(chunk);
        self.meter.record(chunk);
        true
    }

    /// Append `chunk`, then seal the buffer if `limiter` reports a cap.
    pub fn append_limited(
        &mut self,
        chunk: &[u8],
        limiter: &OutputLimiter,
    ) -> Option<LimitKind> {
        if !self.append(chunk) {
            return None;
        }
        let hit = limiter.check(&self.meter);
        if hit.is_some() {
            self.seal();
        }
        hit
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn meter(&self) -> &OutputMeter {
        &self.meter
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}
