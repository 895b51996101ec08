//! Cooperative cancellation token
//!
//! Cancellation is a shared flag observed at explicit checkpoints (the
//! start of each fetch unit, each depth expansion, each stage
//! boundary). Nothing is preempted: a unit mid-fetch runs to
//! completion before the signal is seen.

use crate::{CrawlError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag passed down through every strategy call
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Synchronous; in-flight work completes before the
    /// flag is observed at the next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Checkpoint: surfaces cancellation as an error so it propagates
    /// up the stage pipeline via `?`.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CrawlError::Cancelled)
        } else {
            Ok(())
        }
    }
}
