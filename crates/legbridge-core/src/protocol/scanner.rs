//! Response frame extraction from the raw serial byte stream
//!
//! The board's output is scanned byte by byte. A sync0 byte marks the
//! tentative start of a frame (the most recent one wins), and a terminator
//! byte seen after a start closes the candidate, which is then validated.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{validate, ProtocolError, ReturnData, SYNC0, TERMINATOR};

/// Upper bound on buffered bytes without a closed frame
pub const MAX_BUFFER: usize = 256;

/// What happens to bytes that follow a closed frame in the same read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Keep scanning the bytes after a closed frame
    #[default]
    Continuous,
    /// Clear the buffer after every closed frame, dropping any trailing
    /// bytes. Matches the timing assumptions of the stock board firmware.
    ResetAfterFrame,
}

/// Incremental frame scanner
#[derive(Debug)]
pub struct FrameScanner {
    buffer: Vec<u8>,
    position: usize,
    start: Option<usize>,
    mode: ScanMode,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::new(ScanMode::default())
    }
}

impl FrameScanner {
    /// Empty scanner using `mode`
    pub fn new(mode: ScanMode) -> Self {
        Self {
            buffer: Vec::with_capacity(32),
            position: 0,
            start: None,
            mode,
        }
    }

    /// Current scan mode
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Number of bytes currently held back waiting for a terminator
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed newly read bytes and return the outcome of every candidate
    /// frame closed by them, in wire order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<ReturnData, ProtocolError>> {
        self.buffer.extend_from_slice(bytes);
        let mut results = Vec::new();

        while self.position < self.buffer.len() {
            let byte = self.buffer[self.position];
            if byte == SYNC0 {
                self.start = Some(self.position);
            } else if byte == TERMINATOR {
                if let Some(start) = self.start {
                    results.push(validate(&self.buffer[start..=self.position]));
                    match self.mode {
                        ScanMode::ResetAfterFrame => {
                            self.reset();
                            return results;
                        }
                        ScanMode::Continuous => {
                            self.buffer.drain(..=self.position);
                            self.position = 0;
                            self.start = None;
                            continue;
                        }
                    }
                }
            }
            self.position += 1;
        }

        self.compact();
        results
    }

    /// Drop everything buffered and wait for the next sync0
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.position = 0;
        self.start = None;
    }

    /// Discard bytes that can no longer be part of a frame
    fn compact(&mut self) {
        match self.start {
            None => {
                self.buffer.clear();
                self.position = 0;
            }
            Some(start) if start > 0 => {
                self.buffer.drain(..start);
                self.position -= start;
                self.start = Some(0);
            }
            Some(_) => {}
        }

        if self.buffer.len() > MAX_BUFFER {
            warn!(
                len = self.buffer.len(),
                "scan buffer overflow without terminator, resetting"
            );
            self.reset();
        }
    }
}
