//! Cooperative Cancellation

use crate::error::MiningError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop flag with an optional deadline; clones observe the same flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Error out once cancelled or past the deadline
    pub fn check(&self) -> Result<(), MiningError> {
        if self.is_cancelled() {
            return Err(MiningError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(MiningError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert_eq!(token.check(), Err(MiningError::Cancelled));
    }

    #[test]
    fn test_deadline() {
        let token = CancellationToken::with_deadline(Instant::now());
        assert_eq!(token.check(), Err(MiningError::DeadlineExceeded));
        let token = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(token.check().is_ok());
    }
}
