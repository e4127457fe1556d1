//! Stale Attempt Sweeper
//!
//! Reaps attempts the provider never confirmed as answered or ended. Their
//! connection and billing state is unknown, so they are finalized as failed
//! and never retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dialflow::{AttemptRepository, CallOutcome, DomainError, OutcomeSignals, TelephonyPort};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::lifecycle::CallLifecycle;
use super::stats::DispatchStats;

pub struct StaleAttemptSweeper {
    attempts: Arc<dyn AttemptRepository>,
    telephony: Arc<dyn TelephonyPort>,
    lifecycle: Arc<CallLifecycle>,
    stats: Arc<DispatchStats>,
    stale_after: chrono::Duration,
    every: Duration,
}

impl StaleAttemptSweeper {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        telephony: Arc<dyn TelephonyPort>,
        lifecycle: Arc<CallLifecycle>,
        stats: Arc<DispatchStats>,
        stale_after: chrono::Duration,
        every: Duration,
    ) -> Self {
        Self {
            attempts,
            telephony,
            lifecycle,
            stats,
            stale_after,
            every,
        }
    }

    /// Start the sweeper (runs in background until `shutdown`)
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "🧹 Stale attempt sweeper started (interval: {:?}, stale after {}s)",
            self.every,
            self.stale_after.num_seconds()
        );

        let mut ticker = interval(self.every);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.sweep_once().await {
                Ok(0) => debug!("Sweep found no stale attempts"),
                Ok(reaped) => info!("🧹 Reaped {} stale attempts", reaped),
                Err(e) => warn!(error = %e, "Sweep failed"),
            }
        }
        info!("🧹 Stale attempt sweeper stopped");
    }

    /// Finalize every attempt still initiated or ringing past the threshold
    pub async fn sweep_once(&self) -> Result<usize, DomainError> {
        let cutoff = Utc::now() - self.stale_after;
        self.reap(cutoff, |age| {
            format!("stale: no answer or end confirmed after {}s", age)
        })
        .await
    }

    /// Finalize every attempt still waiting for an answer. Runs after live
    /// conversations drain on shutdown, when no callback will arrive for them.
    pub async fn reap_unanswered(&self) -> Result<usize, DomainError> {
        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        self.reap(cutoff, |_| "shutdown: call never answered".to_string())
            .await
    }

    async fn reap(
        &self,
        cutoff: DateTime<Utc>,
        reason: impl Fn(i64) -> String,
    ) -> Result<usize, DomainError> {
        let pending = self.attempts.list_stale(cutoff).await?;
        let mut reaped = 0;

        for attempt in pending {
            if let Some(provider_call_id) = &attempt.provider_call_id {
                if let Err(e) = self.telephony.hangup(provider_call_id).await {
                    debug!(attempt_id = %attempt.id, error = %e, "Hangup of unanswered call failed");
                }
            }

            let age = attempt.age_secs(Utc::now());
            let signals = OutcomeSignals::for_request(&attempt.request, attempt.status)
                .observe(CallOutcome::Failed)
                .with_error(reason(age));
            match self.lifecycle.close(attempt.id, signals).await {
                Ok(_) => {
                    self.stats.record_stale_reaped();
                    reaped += 1;
                    warn!(attempt_id = %attempt.id, status = %attempt.status, age_secs = age, "Unanswered attempt reaped");
                }
                Err(e) => error!(attempt_id = %attempt.id, error = %e, "Failed to reap attempt"),
            }
        }

        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBedBuilder;
    use dialflow::{CallAttempt, CallRequest, CallStatus};
    use uuid::Uuid;

    fn attempt_started_ago(secs: i64) -> CallAttempt {
        let request = CallRequest::new(Uuid::new_v4(), Uuid::new_v4(), "+919800000070");
        let mut attempt = CallAttempt::new(Uuid::new_v4(), request).placed("CA-stale");
        attempt.started_at = Utc::now() - chrono::Duration::seconds(secs);
        attempt
    }

    #[tokio::test]
    async fn test_reaps_only_stale_unanswered_attempts() {
        let bed = TestBedBuilder::new()
            .configure(|c| c.dispatcher.stale_after_secs = 600)
            .build();

        let stale = attempt_started_ago(900);
        let fresh = attempt_started_ago(30);
        let mut answered = attempt_started_ago(900);
        answered.apply_status(CallStatus::InProgress);
        for attempt in [&stale, &fresh, &answered] {
            bed.attempts.register(attempt).await.unwrap();
        }

        let reaped = bed.engine.sweeper.sweep_once().await.unwrap();
        assert_eq!(reaped, 1);

        let result = bed.wait_for_result(stale.id).await;
        assert_eq!(result.outcome, CallOutcome::Failed);
        assert!(result.error.as_deref().is_some_and(|e| e.starts_with("stale")));
        assert_eq!(bed.telephony.hangups(), vec!["CA-stale".to_string()]);

        assert!(bed.attempts.get(fresh.id).await.unwrap().is_some());
        assert!(bed.attempts.get(answered.id).await.unwrap().is_some());
        assert_eq!(bed.engine.stats.snapshot().stale_reaped, 1);
    }

    #[tokio::test]
    async fn test_drain_finalizes_calls_left_ringing() {
        let bed = TestBedBuilder::new().build();
        let mut ringing = attempt_started_ago(0);
        ringing.apply_status(CallStatus::Ringing);
        let mut answered = attempt_started_ago(0);
        answered.apply_status(CallStatus::InProgress);
        bed.attempts.register(&ringing).await.unwrap();
        bed.attempts.register(&answered).await.unwrap();

        assert!(bed.engine.drain(Duration::from_millis(100)).await);

        let result = bed.wait_for_result(ringing.id).await;
        assert_eq!(result.outcome, CallOutcome::Failed);
        assert!(result.error.as_deref().is_some_and(|e| e.starts_with("shutdown")));
        assert_eq!(bed.telephony.hangups(), vec!["CA-stale".to_string()]);
        assert!(bed.attempts.get(answered.id).await.unwrap().is_some());
    }
}
