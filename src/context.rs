//! Request-scoped cancellation and deadline.
//!
//! Every query carries a `QueryContext` through all of its stages. Stages
//! call [`QueryContext::check`] before issuing a store call and bail out
//! without completing partial work once the context has ended. A deadline
//! expiry is reported distinctly from cancellation.

use crate::{Error, Result};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Cancellation token plus optional deadline for one query.
#[derive(Debug, Clone)]
pub struct QueryContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl QueryContext {
    /// A context that never cancels and has no deadline
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context driven by an externally owned cancellation token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Attach a deadline to an existing context
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns an error if the query has been cancelled or its deadline has
    /// passed. Called before every store call.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        Ok(())
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes_check() {
        assert!(QueryContext::new().check().is_ok());
    }

    #[test]
    fn test_cancelled_context_reports_cancelled() {
        let token = CancellationToken::new();
        let ctx = QueryContext::with_cancellation(token.clone());
        assert!(ctx.check().is_ok());

        token.cancel();
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_reports_deadline_exceeded() {
        let ctx = QueryContext::new().deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_cancellation_wins_over_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = QueryContext::with_cancellation(token)
            .deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }
}
