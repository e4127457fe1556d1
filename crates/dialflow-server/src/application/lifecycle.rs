//! Call lifecycle bookkeeping
//!
//! A dispatch slot is taken before dialing and held until the attempt is
//! finalized, so `max_concurrent_calls` bounds live calls rather than
//! in-flight HTTP requests to the provider.

use std::sync::Arc;

use dashmap::DashMap;
use dialflow::{AttemptRepository, CallResult, DomainError, OutcomeSignals};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use super::outcome_recorder::OutcomeRecorder;

/// Counting semaphore with permits parked per attempt
pub struct CallSlots {
    semaphore: Arc<Semaphore>,
    held: DashMap<Uuid, OwnedSemaphorePermit>,
    capacity: usize,
}

impl CallSlots {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            held: DashMap::new(),
            capacity,
        }
    }

    /// Wait for a free slot. Fails only once the slots are closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, DomainError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DomainError::Cancelled)
    }

    /// Park a permit until `release` is called for the attempt
    pub fn bind(&self, attempt_id: Uuid, permit: OwnedSemaphorePermit) {
        self.held.insert(attempt_id, permit);
    }

    /// Return the attempt's slot; a no-op if it holds none
    pub fn release(&self, attempt_id: Uuid) -> bool {
        self.held.remove(&attempt_id).is_some()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop handing out slots; pending `acquire` calls fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Single exit point for a dialed attempt
pub struct CallLifecycle {
    attempts: Arc<dyn AttemptRepository>,
    recorder: Arc<OutcomeRecorder>,
    slots: Arc<CallSlots>,
}

impl CallLifecycle {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        recorder: Arc<OutcomeRecorder>,
        slots: Arc<CallSlots>,
    ) -> Self {
        Self {
            attempts,
            recorder,
            slots,
        }
    }

    /// Finalize the attempt, drop it from the active registry and free its slot
    pub async fn close(
        &self,
        attempt_id: Uuid,
        signals: OutcomeSignals,
    ) -> Result<CallResult, DomainError> {
        let result = self.recorder.finalize(attempt_id, signals).await;

        if let Err(e) = self.attempts.remove(attempt_id).await {
            warn!(attempt_id = %attempt_id, error = %e, "Failed to remove attempt");
        }
        if self.slots.release(attempt_id) {
            debug!(attempt_id = %attempt_id, in_use = self.slots.in_use(), "Call slot released");
        }

        result
    }

    pub fn recorder(&self) -> &Arc<OutcomeRecorder> {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_held_until_release() {
        let slots = CallSlots::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        slots.bind(a, slots.acquire().await.unwrap());
        slots.bind(b, slots.acquire().await.unwrap());
        assert_eq!(slots.in_use(), 2);
        assert!(slots.semaphore.clone().try_acquire_owned().is_err());

        assert!(slots.release(a));
        assert!(!slots.release(a));
        assert_eq!(slots.in_use(), 1);
    }

    #[tokio::test]
    async fn test_closed_slots_refuse() {
        let slots = CallSlots::new(1);
        slots.close();
        assert!(matches!(slots.acquire().await, Err(DomainError::Cancelled)));
    }
}
