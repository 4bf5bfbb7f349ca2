//! Cooperative cancellation for long traversals.
//!
//! Traversals poll [`QueryContext::check`] once per expanded entity and return
//! [`GraphError::Cancelled`] rather than a partial result.

use crate::error::{GraphError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Per-call cancellation signal: an optional token plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl QueryContext {
    /// Context that never cancels.
    pub fn none() -> Self {
        Self::default()
    }

    /// Context observing `token`.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// Add an absolute deadline.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Add a deadline `timeout` from now.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Fail with [`GraphError::Cancelled`] once the token fires or the deadline passes.
    pub fn check(&self) -> Result<()> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(GraphError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(GraphError::Cancelled);
        }
        Ok(())
    }
}
