//! Batch progress callbacks
//!
//! Every callback fires after the state change it reports has been committed
//! to the batch, and never while the batch state is locked. Callbacks from
//! different items may arrive in any order.

use crate::store::{BatchItem, BatchProgress, BatchStatus};

pub trait BatchObserver: Send + Sync {
    /// Item admitted (now `running`)
    fn on_item_start(&self, _item: &BatchItem) {}

    /// Item run succeeded
    fn on_item_complete(&self, _item: &BatchItem) {}

    /// Item run failed or was rejected
    fn on_item_error(&self, _item: &BatchItem, _message: &str) {}

    /// Counts after any item transition
    fn on_progress(&self, _progress: BatchProgress) {}

    /// Aggregate status changed
    fn on_batch_status(&self, _status: BatchStatus) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}
