//! Dispatcher
//!
//! Pulls requests off the call queue, bounded by the call slots, and turns
//! each into a dialed attempt: compliance check, attempt registration, dial,
//! then retry or finalize on failure. Provider status callbacks come back
//! through `handle_provider_event`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dialflow::{
    AttemptRepository, CallAttempt, CallOutcome, CallRequest, CallStatus, DomainError,
    OutcomeSignals, ProviderEvent, RetryDecision, RetryPolicy, TelephonyPort,
};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::call_queue::CallQueue;
use super::compliance_gate::ComplianceGate;
use super::conversation::{AgentReply, ConversationEngine};
use super::lifecycle::{CallLifecycle, CallSlots};
use super::stats::DispatchStats;

pub struct Dispatcher {
    queue: Arc<CallQueue>,
    gate: Arc<ComplianceGate>,
    telephony: Arc<dyn TelephonyPort>,
    attempts: Arc<dyn AttemptRepository>,
    lifecycle: Arc<CallLifecycle>,
    slots: Arc<CallSlots>,
    conversations: Arc<ConversationEngine>,
    stats: Arc<DispatchStats>,
    retry: RetryPolicy,
    recheck: Duration,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<CallQueue>,
        gate: Arc<ComplianceGate>,
        telephony: Arc<dyn TelephonyPort>,
        attempts: Arc<dyn AttemptRepository>,
        lifecycle: Arc<CallLifecycle>,
        slots: Arc<CallSlots>,
        conversations: Arc<ConversationEngine>,
        stats: Arc<DispatchStats>,
        retry: RetryPolicy,
        recheck: Duration,
    ) -> Self {
        Self {
            queue,
            gate,
            telephony,
            attempts,
            lifecycle,
            slots,
            conversations,
            stats,
            retry,
            recheck,
        }
    }

    /// Accept a request from the campaign scheduler
    pub async fn submit(&self, request: CallRequest) -> Uuid {
        let request_id = request.id;
        debug!(
            request_id = %request_id,
            lead_id = %request.lead_id,
            priority = request.priority,
            "Call request enqueued"
        );
        self.stats.record_enqueued();
        self.queue.enqueue(request).await;
        request_id
    }

    /// Start the dispatch loop (runs in background until `shutdown`)
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(shutdown).await;
        })
    }

    async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "📞 Dispatcher started (max {} concurrent calls)",
            self.slots.capacity()
        );
        let mut workers = JoinSet::new();

        loop {
            while let Some(joined) = workers.try_join_next() {
                log_worker_exit(joined);
            }

            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = self.slots.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let Some(request) = self.next_request(&shutdown).await else {
                break;
            };

            let dispatcher = self.clone();
            workers.spawn(async move { dispatcher.dispatch_one(request, permit).await });
        }

        while let Some(joined) = workers.join_next().await {
            log_worker_exit(joined);
        }
        info!("📞 Dispatcher stopped");
    }

    /// Wait for the next ready request: woken by an enqueue, by the next
    /// delayed request coming due, or by the recheck interval
    async fn next_request(&self, shutdown: &CancellationToken) -> Option<CallRequest> {
        loop {
            if let Some(request) = self.queue.pop_ready(Utc::now()).await {
                return Some(request);
            }

            let wait = match self.queue.next_eligible_at().await {
                Some(at) => (at - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(self.recheck),
                None => self.recheck,
            };

            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = self.queue.notified() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn dispatch_one(&self, request: CallRequest, permit: OwnedSemaphorePermit) {
        self.stats.record_dispatched();

        let check = self.gate.check(&request.phone).await;
        if check.blocked {
            self.stats.record_dnd_rejected();
            info!(
                request_id = %request.id,
                lead_id = %request.lead_id,
                category = ?check.category,
                "Number is on DND, not dialing"
            );
            let signals = OutcomeSignals::for_request(&request, CallStatus::Failed)
                .observe(CallOutcome::Dnd)
                .with_error(format!("dnd: {:?}", check.category));
            // No attempt was made; the result gets an id of its own
            if let Err(e) = self.lifecycle.recorder().finalize(Uuid::new_v4(), signals).await {
                error!(request_id = %request.id, error = %e, "Failed to record DND rejection");
            }
            return;
        }

        let attempt = CallAttempt::new(Uuid::new_v4(), request);
        match self.attempts.register(&attempt).await {
            Ok(()) => {}
            Err(DomainError::Conflict(reason)) => {
                debug!(lead_id = %attempt.request.lead_id, reason = %reason, "Lead busy, deferring");
                let until = Utc::now()
                    + chrono::Duration::from_std(self.recheck)
                        .unwrap_or_else(|_| chrono::Duration::seconds(60));
                self.queue.defer(attempt.request, until).await;
                return;
            }
            Err(e) => {
                self.handle_dial_failure(attempt, e).await;
                return;
            }
        }
        self.slots.bind(attempt.id, permit);

        match self
            .telephony
            .place_call(&attempt.request.phone, attempt.id)
            .await
        {
            Ok(provider_call_id) => {
                self.stats.record_placed();
                info!(
                    attempt_id = %attempt.id,
                    lead_id = %attempt.request.lead_id,
                    provider = %self.telephony.name(),
                    provider_call_id = %provider_call_id,
                    "Call placed"
                );
                self.record_provider_call_id(attempt.id, provider_call_id).await;
            }
            Err(e) => self.handle_dial_failure(attempt, e).await,
        }
    }

    async fn record_provider_call_id(&self, attempt_id: Uuid, provider_call_id: String) {
        // Status callbacks may already have moved (or closed) the attempt
        match self.attempts.get(attempt_id).await {
            Ok(Some(current)) if current.provider_call_id.is_none() => {
                let updated = current.placed(provider_call_id);
                if let Err(e) = self.attempts.update(&updated).await {
                    debug!(attempt_id = %attempt_id, error = %e, "Attempt closed before update");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(attempt_id = %attempt_id, error = %e, "Failed to read attempt"),
        }
    }

    async fn handle_dial_failure(&self, attempt: CallAttempt, error: DomainError) {
        self.stats.record_dial_failure();
        if let Err(e) = self.attempts.remove(attempt.id).await {
            warn!(attempt_id = %attempt.id, error = %e, "Failed to remove attempt");
        }
        self.slots.release(attempt.id);

        let CallAttempt { id, request, .. } = attempt;
        warn!(
            attempt_id = %id,
            lead_id = %request.lead_id,
            retry_count = request.retry_count,
            error = %error,
            "Dial failed"
        );

        match self.retry.decide(request, Utc::now()) {
            RetryDecision::Retry(next) => {
                self.stats.record_retry();
                info!(
                    request_id = %next.id,
                    retry_count = next.retry_count,
                    priority = next.priority,
                    "Re-enqueueing failed dial"
                );
                self.queue.enqueue(next).await;
            }
            RetryDecision::GiveUp(request) => {
                let signals = OutcomeSignals::for_request(&request, CallStatus::Failed)
                    .observe(CallOutcome::Failed)
                    .with_error(error.to_string());
                if let Err(e) = self.lifecycle.close(id, signals).await {
                    error!(attempt_id = %id, error = %e, "Failed to record dial failure");
                }
            }
        }
    }

    /// Apply a translated provider status callback
    pub async fn handle_provider_event(&self, event: ProviderEvent) -> Result<(), DomainError> {
        let Some(mut attempt) = self.attempts.get(event.attempt_id).await? else {
            if self.lifecycle.recorder().get(event.attempt_id).await?.is_some() {
                debug!(attempt_id = %event.attempt_id, status = %event.status, "Late callback ignored");
            } else {
                warn!(attempt_id = %event.attempt_id, status = %event.status, "Callback for unknown attempt");
            }
            return Ok(());
        };

        let mut dirty = false;
        if attempt.provider_call_id.is_none() {
            if let Some(provider_call_id) = &event.provider_call_id {
                attempt.provider_call_id = Some(provider_call_id.clone());
                dirty = true;
            }
        }

        debug!(attempt_id = %attempt.id, status = %event.status, "Provider event");
        match event.status {
            CallStatus::Initiated | CallStatus::Ringing => {
                if attempt.apply_status(event.status) || dirty {
                    self.attempts.update(&attempt).await?;
                }
            }
            CallStatus::InProgress => {
                if attempt.apply_status(CallStatus::InProgress) || dirty {
                    self.attempts.update(&attempt).await?;
                }
                self.conversations.start(&attempt).await;
            }
            _ => self.finish(attempt, event).await?,
        }
        Ok(())
    }

    async fn finish(&self, attempt: CallAttempt, event: ProviderEvent) -> Result<(), DomainError> {
        let ended = self
            .conversations
            .end(
                attempt.id,
                event.status,
                event.duration_secs,
                event.recording_url.clone(),
            )
            .await;
        if ended {
            return Ok(());
        }

        if event.status == CallStatus::Voicemail {
            if let Some(provider_call_id) = &attempt.provider_call_id {
                if let Err(e) = self.telephony.hangup(provider_call_id).await {
                    warn!(attempt_id = %attempt.id, error = %e, "Voicemail hangup failed");
                }
            }
        }

        let mut recording_url = event.recording_url;
        if recording_url.is_none() && event.status == CallStatus::Completed {
            if let Some(provider_call_id) = &attempt.provider_call_id {
                recording_url = self
                    .telephony
                    .get_recording(provider_call_id)
                    .await
                    .unwrap_or_default();
            }
        }

        let mut signals =
            OutcomeSignals::for_request(&attempt.request, event.status).with_recording(recording_url);
        signals.duration_secs = event.duration_secs.unwrap_or(0);
        self.lifecycle.close(attempt.id, signals).await?;
        Ok(())
    }

    /// The call was answered and the provider wants the first utterance
    pub async fn on_answer(&self, attempt_id: Uuid) -> Result<AgentReply, DomainError> {
        if self.conversations.is_live(attempt_id) {
            return self.conversations.reprompt(attempt_id).await;
        }
        let mut attempt = self
            .attempts
            .get(attempt_id)
            .await?
            .ok_or_else(|| DomainError::not_found("CallAttempt", attempt_id))?;
        if attempt.apply_status(CallStatus::InProgress) {
            self.attempts.update(&attempt).await?;
        }
        Ok(self.conversations.start(&attempt).await)
    }

    /// Ask the provider for an attempt's current status and apply it
    pub async fn refresh_attempt(&self, attempt_id: Uuid) -> Result<Option<CallAttempt>, DomainError> {
        let Some(attempt) = self.attempts.get(attempt_id).await? else {
            return Ok(None);
        };
        let Some(provider_call_id) = attempt.provider_call_id.clone() else {
            return Ok(Some(attempt));
        };

        let remote = self.telephony.get_status(&provider_call_id).await?;
        if remote.status != attempt.status {
            let mut event = ProviderEvent::new(attempt_id, remote.status);
            event.duration_secs = remote.duration_secs;
            self.handle_provider_event(event).await?;
        }
        self.attempts.get(attempt_id).await
    }
}

fn log_worker_exit(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "Dispatch worker panicked");
        } else {
            warn!(error = %e, "Dispatch worker cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingTelephony, StaticRegistry, TestBedBuilder};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn request(phone: &str) -> CallRequest {
        CallRequest::new(Uuid::new_v4(), Uuid::new_v4(), phone)
    }

    #[tokio::test]
    async fn test_three_failures_retry_twice_then_fail() {
        let failing = Arc::new(FailingTelephony::default());
        let bed = TestBedBuilder::new()
            .with_telephony(failing.clone())
            .configure(|c| {
                c.dispatcher.max_retries = 3;
                c.dispatcher.retry_delay_secs = 0;
            })
            .build();
        bed.start();

        let request = request("+919800000050");
        let lead_id = request.lead_id;
        bed.engine.dispatcher.submit(request).await;

        let result = bed.wait_for_lead_result(lead_id).await;
        assert_eq!(result.outcome, CallOutcome::Failed);
        assert_eq!(result.status, CallStatus::Failed);
        assert!(result.error.is_some());

        let stats = bed.engine.stats.snapshot();
        assert_eq!(stats.retries, 2);
        assert_eq!(stats.dial_failures, 3);
        assert_eq!(failing.attempts(), 3);
        assert_eq!(bed.engine.slots.in_use(), 0);
    }

    #[tokio::test]
    async fn test_dnd_number_is_never_dialed() {
        let bed = TestBedBuilder::new()
            .with_registry(StaticRegistry::blocking(["+919800000051"]))
            .build();
        bed.start();

        let request = request("+919800000051");
        let lead_id = request.lead_id;
        bed.engine.dispatcher.submit(request).await;

        let result = bed.wait_for_lead_result(lead_id).await;
        assert_eq!(result.outcome, CallOutcome::Dnd);
        assert!(bed.telephony.dialed().is_empty());
        assert_eq!(bed.engine.stats.snapshot().dnd_rejected, 1);
    }

    #[tokio::test]
    async fn test_concurrent_calls_never_exceed_limit() {
        let bed = TestBedBuilder::new()
            .configure(|c| c.dispatcher.max_concurrent_calls = 2)
            .build();
        bed.start();

        for i in 0..5 {
            bed.engine
                .dispatcher
                .submit(request(&format!("+91980000006{}", i)))
                .await;
        }

        let mut finished = HashSet::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while finished.len() < 5 {
            assert!(tokio::time::Instant::now() < deadline, "calls did not drain");
            let placed = bed.telephony.placed_attempts();
            assert!(placed.len() - finished.len() <= 2);
            for attempt_id in placed {
                if finished.insert(attempt_id) {
                    bed.engine
                        .dispatcher
                        .handle_provider_event(ProviderEvent::new(attempt_id, CallStatus::NoAnswer))
                        .await
                        .unwrap();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(bed.telephony.high_water_mark() <= 2);
        assert_eq!(bed.telephony.dialed().len(), 5);
        bed.wait_for_finalized(5).await;
        assert_eq!(bed.engine.stats.snapshot().outcomes.get("no_answer"), Some(&5));
    }

    #[tokio::test]
    async fn test_provider_events_drive_attempt() {
        let bed = TestBedBuilder::new().build();
        bed.start();
        let dispatcher = &bed.engine.dispatcher;

        dispatcher.submit(request("+919800000052")).await;
        let attempt_id = bed.wait_for_placed(1).await[0];
        bed.wait_for_provider_id(attempt_id).await;

        dispatcher
            .handle_provider_event(ProviderEvent::new(attempt_id, CallStatus::Ringing))
            .await
            .unwrap();
        let attempt = bed.attempts.get(attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status, CallStatus::Ringing);

        dispatcher
            .handle_provider_event(ProviderEvent::new(attempt_id, CallStatus::InProgress))
            .await
            .unwrap();
        assert!(bed.engine.conversations.is_live(attempt_id));

        let completed = ProviderEvent::new(attempt_id, CallStatus::Completed)
            .with_duration(30)
            .with_recording("https://recordings.example/1");
        dispatcher.handle_provider_event(completed.clone()).await.unwrap();
        let result = bed.wait_for_result(attempt_id).await;
        assert_eq!(result.duration_secs, 30);
        assert_eq!(result.outcome, CallOutcome::NotInterested);

        // A duplicate terminal callback changes nothing
        dispatcher.handle_provider_event(completed).await.unwrap();
        assert_eq!(bed.wait_for_result(attempt_id).await, result);
    }

    #[tokio::test]
    async fn test_answer_during_finalization_does_not_reopen() {
        let bed = TestBedBuilder::new().build();
        bed.telephony.delay_recordings(Duration::from_millis(300));
        bed.start();
        let dispatcher = &bed.engine.dispatcher;

        dispatcher.submit(request("+919800000056")).await;
        let attempt_id = bed.wait_for_placed(1).await[0];
        bed.wait_for_provider_id(attempt_id).await;
        dispatcher.on_answer(attempt_id).await.unwrap();
        assert!(bed.engine.conversations.is_live(attempt_id));

        assert!(
            bed.engine
                .conversations
                .end(attempt_id, CallStatus::Completed, None, None)
                .await
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dispatcher.on_answer(attempt_id).await.is_err());

        bed.wait_for_result(attempt_id).await;
        assert!(bed.engine.conversations.wait_idle(Duration::from_secs(2)).await);
        assert_eq!(bed.engine.conversations.live_count(), 0);
        assert!(dispatcher.on_answer(attempt_id).await.is_err());
        assert_eq!(bed.engine.stats.snapshot().finalized, 1);
    }

    #[tokio::test]
    async fn test_unanswered_call_releases_slot() {
        let bed = TestBedBuilder::new()
            .configure(|c| c.dispatcher.max_concurrent_calls = 1)
            .build();
        bed.start();

        bed.engine.dispatcher.submit(request("+919800000053")).await;
        let attempt_id = bed.wait_for_placed(1).await[0];
        assert_eq!(bed.engine.slots.in_use(), 1);

        bed.engine
            .dispatcher
            .handle_provider_event(ProviderEvent::new(attempt_id, CallStatus::Busy))
            .await
            .unwrap();
        let result = bed.wait_for_result(attempt_id).await;
        assert_eq!(result.outcome, CallOutcome::NoAnswer);
        assert_eq!(bed.engine.slots.in_use(), 0);
    }

    #[tokio::test]
    async fn test_lead_with_active_attempt_is_deferred() {
        let bed = TestBedBuilder::new().build();
        let existing = CallAttempt::new(Uuid::new_v4(), request("+919800000054"));
        bed.attempts.register(&existing).await.unwrap();
        bed.start();

        let duplicate = CallRequest::new(existing.request.lead_id, Uuid::new_v4(), "+919800000054");
        bed.engine.dispatcher.submit(duplicate).await;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while bed.engine.queue.depth().await.delayed == 0 {
            assert!(tokio::time::Instant::now() < deadline, "request was not deferred");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(bed.telephony.dialed().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_applies_remote_status() {
        let bed = TestBedBuilder::new().build();
        bed.start();
        bed.engine.dispatcher.submit(request("+919800000055")).await;
        let attempt_id = bed.wait_for_placed(1).await[0];
        bed.wait_for_provider_id(attempt_id).await;

        bed.telephony.set_remote_status(CallStatus::Ringing);
        let attempt = bed
            .engine
            .dispatcher
            .refresh_attempt(attempt_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attempt.status, CallStatus::Ringing);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_blocked_numbers_never_dialed(flags in proptest::collection::vec(any::<bool>(), 1..8)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let phones: Vec<String> = (0..flags.len()).map(|i| format!("+9198700000{:02}", i)).collect();
            let blocked: HashSet<String> = phones
                .iter()
                .zip(&flags)
                .filter(|(_, b)| **b)
                .map(|(p, _)| p.clone())
                .collect();

            let dialed = runtime.block_on(async {
                let bed = TestBedBuilder::new()
                    .with_registry(StaticRegistry::blocking(blocked.iter().cloned().collect::<Vec<_>>()))
                    .configure(|c| c.dispatcher.max_concurrent_calls = 16)
                    .build();
                bed.start();
                for phone in &phones {
                    bed.engine.dispatcher.submit(request(phone)).await;
                }

                let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
                loop {
                    let seen = bed.telephony.dialed().len() as u64
                        + bed.engine.stats.snapshot().dnd_rejected;
                    if seen as usize >= phones.len() || tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                bed.shutdown.cancel();
                bed.telephony.dialed()
            });

            prop_assert_eq!(dialed.len(), phones.len() - blocked.len());
            for phone in &dialed {
                prop_assert!(!blocked.contains(phone));
            }
        }
    }
}
