//! Request scheduler: global concurrency limiting and politeness delay
//!
//! Every network request of a run, listing or detail, first obtains a
//! [`RequestSlot`] from the same [`Scheduler`]. The slot holds one permit of a
//! shared semaphore and gives it back when dropped, so the permit is released
//! on every exit path: success, error, timeout, or a cancelled task.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Returned when the run was cancelled before a slot could be handed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Permission to issue exactly one request
///
/// Dropping the slot returns its permit to the scheduler.
#[derive(Debug)]
pub struct RequestSlot {
    _permit: OwnedSemaphorePermit,
}

/// Shared gate in front of every outbound request
#[derive(Debug, Clone)]
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    delay: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler allowing `max_concurrent` requests in flight
    pub fn new(max_concurrent: usize, delay: Duration, cancel: CancellationToken) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            delay,
            cancel,
        }
    }

    /// Waits for a free slot, then applies the politeness delay
    ///
    /// Returns `Err(Cancelled)` if the run is cancelled before the request
    /// could be issued; in that case no permit is held.
    pub async fn acquire(&self) -> Result<RequestSlot, Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Cancelled),
            permit = self.semaphore.clone().acquire_owned() => permit.map_err(|_| Cancelled)?,
        };

        if !self.delay.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        Ok(RequestSlot { _permit: permit })
    }

    /// Sleeps for a retry backoff, waking early if the run is cancelled
    pub async fn backoff(&self, delay: Duration) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of requests that could start right now
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
