//! Batch sizing and run-completion decisions.

use ipcstress_common::MAX_BATCH_REQUESTS;

/// Partitions a run's total request count into bounded batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    max_batch_requests: u64,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(MAX_BATCH_REQUESTS)
    }
}

impl BatchScheduler {
    pub fn new(max_batch_requests: u64) -> Self {
        Self { max_batch_requests }
    }

    /// Size of the next batch: the remaining count, capped.
    pub fn next_batch_size(&self, remaining: u64) -> u64 {
        self.max_batch_requests.min(remaining)
    }

    /// The run is complete once nothing remains and no batch is in
    /// flight. "No batch yet" and "previous batch just finished" are
    /// both `batch_in_flight == false`; the caller distinguishes them
    /// by the presence of the active batch handle, not here.
    pub fn is_run_complete(&self, remaining: u64, batch_in_flight: bool) -> bool {
        remaining == 0 && !batch_in_flight
    }
}
