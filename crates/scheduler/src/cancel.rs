//! Cancellation token for cooperative render cancellation
//!
//! A render task holds a clone of the token it was started with and checks
//! it at every yield point. Whoever supersedes the task flips the token; the
//! task notices on its next step and stops before touching more pixels.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative task cancellation
///
/// Clones share the same underlying flag. A token is never reset: a task
/// that was cancelled stays cancelled, and new work always gets a fresh
/// token from [`crate::TaskSlot`].
///
/// # Example
///
/// ```
/// use sigplace_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let task_token = token.clone();
///
/// token.cancel();
/// assert!(task_token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel this token
    ///
    /// All clones observe the cancellation. Calling it again is a no-op.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if this token has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether two tokens share the same flag
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
