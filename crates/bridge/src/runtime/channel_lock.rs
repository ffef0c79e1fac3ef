//! Per-channel serialization of conversation turns.
//!
//! When enabled, a second message on a channel waits until the turn in
//! flight has finished. This also closes the duplicate-thread race on a
//! channel's first two messages.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Channel id → `Semaphore(1)`. Holding the permit grants the turn.
#[derive(Default)]
pub struct ChannelLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ChannelLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `channel_id`. The lock is released when
    /// the permit is dropped.
    pub async fn acquire(&self, channel_id: &str) -> Result<OwnedSemaphorePermit, AcquireError> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(channel_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await
    }

    pub fn channel_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Forget channels whose lock nobody holds or waits on.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}
