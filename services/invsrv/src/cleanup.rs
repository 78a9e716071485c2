//! Batch asset cleanup
//!
//! When a warehouse or locker is deleted, the attached asset objects are
//! removed through a bounded fan-out over the asset store. Every failure is
//! logged and counted, never propagated: the caller deletes the owning
//! database rows regardless, and storage catches up on a later pass.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::context::SyncContext;
use crate::store::AssetStore;

pub const DEFAULT_CLEANUP_CONCURRENCY: usize = 5;

/// Per-batch deletion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub deleted: usize,
    pub failed: usize,
}

pub struct BatchCleanup {
    store: Arc<dyn AssetStore>,
    concurrency: usize,
}

impl BatchCleanup {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self {
            store,
            concurrency: DEFAULT_CLEANUP_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Delete the given objects with bounded concurrency
    ///
    /// Always returns the outcome counts; a failed deletion never fails the
    /// batch.
    pub async fn run(&self, ctx: &SyncContext, refs: Vec<String>) -> CleanupOutcome {
        if refs.is_empty() {
            return CleanupOutcome::default();
        }
        debug!(
            trace_id = %ctx.trace_id,
            refs = refs.len(),
            concurrency = self.concurrency,
            "asset cleanup started"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::new();
        for object_ref in refs {
            let sem = semaphore.clone();
            let store = self.store.clone();
            let trace_id = ctx.trace_id.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = match sem.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                match store.delete(&object_ref).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            trace_id = %trace_id,
                            object_ref = %object_ref,
                            error = %e,
                            "asset deletion failed"
                        );
                        false
                    }
                }
            }));
        }

        let mut outcome = CleanupOutcome::default();
        for result in join_all(tasks).await {
            match result {
                Ok(true) => outcome.deleted += 1,
                Ok(false) => outcome.failed += 1,
                Err(e) => {
                    error!(trace_id = %ctx.trace_id, error = %e, "cleanup task panicked");
                    outcome.failed += 1;
                }
            }
        }

        debug!(
            trace_id = %ctx.trace_id,
            deleted = outcome.deleted,
            failed = outcome.failed,
            "asset cleanup finished"
        );
        outcome
    }
}
