use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::OptimizeError;

/// Shared flag used to abort an in-flight optimization.
///
/// Clones observe the same flag, so a caller can keep one clone and hand
/// another to the optimizer.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails with [`OptimizeError::Cancelled`] once [`cancel`](Self::cancel) was called
    pub fn check(&self) -> Result<(), OptimizeError> {
        if self.is_cancelled() {
            Err(OptimizeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
