//! The durable-in-principle failed-batch queue.
//!
//! Process-lifetime, in-memory, guarded by its own mutex — distinct from
//! the book's mutex so a stuck retry pass never blocks order admission.
//! Retrying a queued batch needs chain access, so the actual retry loop
//! lives on [`crate::submission::pipeline::SubmissionPipeline`]; this type
//! only holds the `FailedBatch` records and the operations that don't need network access.

use std::time::SystemTime;

use parking_lot::Mutex;

/// A batch whose submission exhausted all configured retries.
#[derive(Debug, Clone)]
pub struct FailedBatch {
    pub root: [u8; 32],
    pub fills: Vec<u8>,
    pub sig: Vec<u8>,
    pub first_failure_time: SystemTime,
    pub attempt_count: usize,
}

impl FailedBatch {
    pub fn new(root: [u8; 32], fills: Vec<u8>, sig: Vec<u8>, attempt_count: usize) -> Self {
        Self {
            root,
            fills,
            sig,
            first_failure_time: SystemTime::now(),
            attempt_count,
        }
    }
}

/// In-memory ordered queue of [`FailedBatch`] records.
#[derive(Default)]
pub struct FailedQueue {
    batches: Mutex<Vec<FailedBatch>>,
}

impl FailedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, batch: FailedBatch) {
        self.batches.lock().push(batch);
    }

    pub fn count(&self) -> usize {
        self.batches.lock().len()
    }

    /// A copy of the queue's contents, not a reference — callers must not
    /// assume mutations to the returned vector affect the queue.
    pub fn snapshot(&self) -> Vec<FailedBatch> {
        self.batches.lock().clone()
    }

    pub fn clear(&self) {
        self.batches.lock().clear();
    }

    /// Remove entries at the given original indices. Indices must be
    /// supplied in descending order so earlier removals don't shift the
    /// indices of entries still to be removed.
    pub(super) fn remove_indices_descending(&self, mut indices: Vec<usize>) {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        let mut batches = self.batches.lock();
        for idx in indices {
            if idx < batches.len() {
                batches.remove(idx);
            }
        }
    }
}
