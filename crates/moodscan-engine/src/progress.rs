//! Batch progress signals

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

/// Emitted after every completed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Texts with a result so far
    pub processed: usize,
    pub total: usize,
    /// Zero-based index of the chunk just completed
    pub chunk_index: usize,
    /// Whether the batch has fallen back to the rule-based path
    pub degraded: bool,
}

impl Progress {
    /// Completed share in [0, 1]; an empty batch counts as complete
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f32 / self.total as f32
        }
    }

    pub fn is_done(&self) -> bool {
        self.processed >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.processed, self.total)?;
        if self.degraded {
            f.write_str(" (degraded)")?;
        }
        Ok(())
    }
}

/// Bounded channel for progress signals.
///
/// The sender waits when the buffer is full, so the receiving side must keep
/// draining it while a batch runs.
pub fn progress_channel(capacity: usize) -> (mpsc::Sender<Progress>, mpsc::Receiver<Progress>) {
    mpsc::channel(capacity.max(1))
}
