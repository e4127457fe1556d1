//! Call Queue
//!
//! Priority queue of pending call requests with a delay lane. Ready
//! requests dequeue by `(priority, eligible time, enqueue order)`; requests
//! whose eligible time is in the future wait in a separate heap keyed by that
//! time and are promoted once it passes. Waiters are woken on enqueue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use dialflow::CallRequest;
use tokio::sync::{Mutex, Notify};

#[derive(Debug)]
struct ReadyEntry {
    request: CallRequest,
    eligible_at: DateTime<Utc>,
    seq: u64,
}

impl ReadyEntry {
    fn key(&self) -> (i32, DateTime<Utc>, u64) {
        (self.request.priority, self.eligible_at, self.seq)
    }
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ReadyEntry {}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyEntry {
    // BinaryHeap is a max-heap; the smallest key must come out first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

#[derive(Debug)]
struct DelayedEntry {
    request: CallRequest,
    eligible_at: DateTime<Utc>,
    seq: u64,
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        (self.eligible_at, self.seq) == (other.eligible_at, other.seq)
    }
}

impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.eligible_at, other.seq).cmp(&(self.eligible_at, self.seq))
    }
}

#[derive(Debug, Default)]
struct Lanes {
    ready: BinaryHeap<ReadyEntry>,
    delayed: BinaryHeap<DelayedEntry>,
    seq: u64,
}

impl Lanes {
    fn promote(&mut self, now: DateTime<Utc>) {
        while self
            .delayed
            .peek()
            .is_some_and(|head| head.eligible_at <= now)
        {
            if let Some(entry) = self.delayed.pop() {
                self.ready.push(ReadyEntry {
                    request: entry.request,
                    eligible_at: entry.eligible_at,
                    seq: entry.seq,
                });
            }
        }
    }
}

/// Shared call queue
#[derive(Debug, Default)]
pub struct CallQueue {
    lanes: Mutex<Lanes>,
    notify: Notify,
}

/// Queue depth by lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueDepth {
    pub ready: usize,
    pub delayed: usize,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a request; it is ready now unless its earliest eligible time is later
    pub async fn enqueue(&self, request: CallRequest) {
        let now = Utc::now();
        let eligible_at = request.earliest_eligible_at.unwrap_or(now);
        {
            let mut lanes = self.lanes.lock().await;
            lanes.seq += 1;
            let seq = lanes.seq;
            if eligible_at > now {
                lanes.delayed.push(DelayedEntry {
                    request,
                    eligible_at,
                    seq,
                });
            } else {
                lanes.ready.push(ReadyEntry {
                    request,
                    eligible_at,
                    seq,
                });
            }
        }
        self.notify.notify_one();
    }

    /// Put a request back, not eligible before `until`
    pub async fn defer(&self, request: CallRequest, until: DateTime<Utc>) {
        self.enqueue(request.eligible_at(until)).await;
    }

    /// Remove the head of the ready lane, promoting delayed requests that have
    /// become eligible by `now`
    pub async fn pop_ready(&self, now: DateTime<Utc>) -> Option<CallRequest> {
        let mut lanes = self.lanes.lock().await;
        lanes.promote(now);
        lanes.ready.pop().map(|entry| entry.request)
    }

    /// Earliest eligible time in the delay lane
    pub async fn next_eligible_at(&self) -> Option<DateTime<Utc>> {
        self.lanes.lock().await.delayed.peek().map(|e| e.eligible_at)
    }

    /// Resolves after the next enqueue (or immediately if one happened since
    /// the last wake-up)
    pub async fn notified(&self) {
        self.notify.notified().await
    }

    pub async fn depth(&self) -> QueueDepth {
        let lanes = self.lanes.lock().await;
        QueueDepth {
            ready: lanes.ready.len(),
            delayed: lanes.delayed.len(),
        }
    }

    pub async fn len(&self) -> usize {
        let depth = self.depth().await;
        depth.ready + depth.delayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn request(priority: i32) -> CallRequest {
        CallRequest::new(Uuid::new_v4(), Uuid::new_v4(), "+919800000010").with_priority(priority)
    }

    #[tokio::test]
    async fn test_priority_order() {
        let queue = CallQueue::new();
        for priority in [5, 1, 3] {
            queue.enqueue(request(priority)).await;
        }

        let now = Utc::now();
        let mut order = Vec::new();
        while let Some(r) = queue.pop_ready(now).await {
            order.push(r.priority);
        }
        assert_eq!(order, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_fifo_within_priority() {
        let queue = CallQueue::new();
        let first = request(2);
        let second = request(2);
        let (first_id, second_id) = (first.id, second.id);
        queue.enqueue(first).await;
        queue.enqueue(second).await;

        let now = Utc::now();
        assert_eq!(queue.pop_ready(now).await.map(|r| r.id), Some(first_id));
        assert_eq!(queue.pop_ready(now).await.map(|r| r.id), Some(second_id));
    }

    #[tokio::test]
    async fn test_earlier_eligible_wins_on_equal_priority() {
        let queue = CallQueue::new();
        let now = Utc::now();
        let later = request(1).eligible_at(now - Duration::seconds(5));
        let earlier = request(1).eligible_at(now - Duration::seconds(60));
        let earlier_id = earlier.id;
        queue.enqueue(later).await;
        queue.enqueue(earlier).await;

        assert_eq!(queue.pop_ready(Utc::now()).await.map(|r| r.id), Some(earlier_id));
    }

    #[tokio::test]
    async fn test_future_requests_wait_in_delay_lane() {
        let queue = CallQueue::new();
        let now = Utc::now();
        let eligible = now + Duration::minutes(30);
        queue.enqueue(request(0).eligible_at(eligible)).await;
        queue.enqueue(request(9)).await;

        assert_eq!(queue.depth().await, QueueDepth { ready: 1, delayed: 1 });
        assert_eq!(queue.next_eligible_at().await, Some(eligible));

        // Only the ready request comes out now, despite its worse priority
        assert_eq!(queue.pop_ready(now).await.map(|r| r.priority), Some(9));
        assert!(queue.pop_ready(now).await.is_none());

        // Once the eligible time passes it is promoted
        let promoted = queue.pop_ready(eligible + Duration::seconds(1)).await;
        assert_eq!(promoted.map(|r| r.priority), Some(0));
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn test_enqueue_wakes_waiter() {
        let queue = std::sync::Arc::new(CallQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.notified().await })
        };
        queue.enqueue(request(1)).await;
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter woken")
            .unwrap();
    }
}
