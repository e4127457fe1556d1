//! Outcome Recorder
//!
//! Turns everything observed about an attempt into its one immutable
//! `CallResult`. Keyed by attempt id: finalizing twice returns the stored
//! result untouched. Newly recorded results fan out to every sink on its own
//! task so a slow or failing sink never holds up recording.

use std::sync::Arc;

use dialflow::{
    derive_outcome, lead_temperature, CallResult, CallResultRepository, DomainError,
    OutcomeSignals, OutcomeSink,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::stats::DispatchStats;

pub struct OutcomeRecorder {
    results: Arc<dyn CallResultRepository>,
    sinks: Vec<Arc<dyn OutcomeSink>>,
    stats: Arc<DispatchStats>,
}

impl OutcomeRecorder {
    pub fn new(
        results: Arc<dyn CallResultRepository>,
        sinks: Vec<Arc<dyn OutcomeSink>>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            results,
            sinks,
            stats,
        }
    }

    pub async fn finalize(
        &self,
        attempt_id: Uuid,
        signals: OutcomeSignals,
    ) -> Result<CallResult, DomainError> {
        if let Some(existing) = self.results.find(attempt_id).await? {
            debug!(attempt_id = %attempt_id, "Attempt already finalized");
            return Ok(existing);
        }

        let outcome = derive_outcome(&signals);
        let mut signals = signals;
        let mut observed = signals.observed.clone();
        observed.push(outcome);
        signals.temperature = lead_temperature(&observed, signals.lead_score);

        let result = CallResult::new(attempt_id, signals, outcome);
        let (stored, inserted) = self.results.insert_if_absent(result).await?;

        if inserted {
            self.stats.record_outcome(stored.outcome);
            info!(
                attempt_id = %attempt_id,
                lead_id = %stored.lead_id,
                outcome = %stored.outcome,
                status = %stored.status,
                lead_score = stored.lead_score,
                "Call finalized"
            );
            self.fan_out(&stored);
        }

        Ok(stored)
    }

    pub async fn get(&self, attempt_id: Uuid) -> Result<Option<CallResult>, DomainError> {
        self.results.find(attempt_id).await
    }

    fn fan_out(&self, result: &CallResult) {
        for sink in &self.sinks {
            let sink = sink.clone();
            let result = result.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.deliver_with_retry(&result).await {
                    warn!(
                        sink = %sink.name(),
                        attempt_id = %result.attempt_id,
                        error = %e,
                        "Outcome sink delivery failed"
                    );
                }
            });
        }
    }
}
