use thiserror::Error;

/// Default hard cap on accumulated stream text (1 MiB)
pub const DEFAULT_BUFFER_CAP: usize = 1024 * 1024;

#[derive(Debug, Error)]
#[error("Stream buffer exceeded {cap} bytes")]
pub struct BufferOverflow {
    pub cap: usize,
}

/// Append-only accumulator for one attempt's raw stream text
///
/// Owned exclusively by one attempt; a retried or superseded attempt gets a
/// fresh buffer. The byte cap turns a stream that never closes its structure
/// into a terminal error instead of unbounded growth.
pub struct ChunkBuffer {
    text: String,
    cap: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_BUFFER_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            text: String::new(),
            cap,
        }
    }

    pub fn append(&mut self, chunk: &str) -> Result<(), BufferOverflow> {
        if self.text.len() + chunk.len() > self.cap {
            return Err(BufferOverflow { cap: self.cap });
        }
        self.text.push_str(chunk);
        Ok(())
    }

    /// Borrow the accumulated text; re-snapshot after every append
    pub fn snapshot(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}
