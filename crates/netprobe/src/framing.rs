//! Line framing for probe process output.
//!
//! Probe tools write their output in arbitrary chunks. [`LineFramer`] turns
//! those chunks back into complete, trimmed lines, carrying any partial line
//! over to the next chunk.
//!
//! When the stream ends, a trailing fragment that never saw a newline is
//! dropped by [`LineFramer::finish`]. Error output is the exception: callers
//! that must not lose a final unterminated message use
//! [`LineFramer::take_remainder`] instead.

use tracing::debug;

/// Splits a byte stream into trimmed, non-empty lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and iterate over every line it completes.
    ///
    /// Bytes after the last newline stay buffered and are prepended to the
    /// next chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Lines {
        self.pending.extend_from_slice(chunk);

        let complete = match self.pending.iter().rposition(|&b| b == b'\n') {
            Some(idx) => {
                let rest = self.pending.split_off(idx + 1);
                std::mem::replace(&mut self.pending, rest)
            }
            None => Vec::new(),
        };

        Lines { complete, cursor: 0 }
    }

    /// Number of buffered bytes still waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// End the stream, discarding any unterminated fragment.
    ///
    /// Returns the number of bytes that were dropped.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending.len();
        if dropped > 0 {
            debug!(bytes = dropped, "Discarding unterminated trailing fragment");
        }
        self.pending.clear();
        dropped
    }

    /// End the stream, returning the unterminated fragment as a final line.
    ///
    /// The fragment is trimmed like any other line; `None` if nothing but
    /// whitespace was pending.
    pub fn take_remainder(&mut self) -> Option<String> {
        let pending = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&pending);
        let trimmed = line.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Lazy iterator over the lines completed by one [`LineFramer::feed`] call.
#[derive(Debug)]
pub struct Lines {
    complete: Vec<u8>,
    cursor: usize,
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.complete.len() {
            let rest = &self.complete[self.cursor..];
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            self.cursor += end + 1;

            let line = String::from_utf8_lossy(&rest[..end]);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        None
    }
}
