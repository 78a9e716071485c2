//! Per-call sync context
//!
//! Carries the trace identifier and the cancellation token through every
//! engine call instead of relying on ambient state.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, StockError};

/// Explicit context threaded through one sync invocation
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Correlates all log lines of one invocation
    pub trace_id: String,
    pub cancel: CancellationToken,
}

impl SyncContext {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Context tied to an externally owned cancellation token, for callers
    /// that manage shutdown themselves
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            cancel,
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Fail fast once the caller has cancelled
    ///
    /// Checked between rows and before network calls so a cancelled sync
    /// stops issuing new work. Writes already applied stay applied.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(StockError::Cancelled(format!(
                "sync {} cancelled by caller",
                self.trace_id
            )));
        }
        Ok(())
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_not_cancelled() {
        let ctx = SyncContext::new();
        assert!(ctx.check_cancelled().is_ok());
        assert!(!ctx.trace_id.is_empty());
    }

    #[test]
    fn test_cancelled_context_errors() {
        let ctx = SyncContext::new();
        ctx.cancel.cancel();
        let err = ctx.check_cancelled().unwrap_err();
        assert!(matches!(err, StockError::Cancelled(_)));
    }

    #[test]
    fn test_trace_id_override() {
        let ctx = SyncContext::new().with_trace_id("req-42");
        assert_eq!(ctx.trace_id, "req-42");
    }
}
