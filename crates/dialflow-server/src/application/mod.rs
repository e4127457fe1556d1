//! Application Layer
//!
//! Use cases wired from ports. Everything here is constructed once by
//! `Engine::build` and shared through `Arc`.

pub mod call_queue;
pub mod compliance_gate;
pub mod conversation;
pub mod dispatcher;
pub mod intent_classifier;
pub mod lifecycle;
pub mod outcome_recorder;
pub mod stats;
pub mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use dialflow::{
    AttemptRepository, CallResultRepository, ComplianceRegistry, DndRepository, LanguageModel,
    OutcomeSink, SpeechToText, TelephonyPort, TextToSpeech,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use call_queue::{CallQueue, QueueDepth};
pub use compliance_gate::{ComplianceCheck, ComplianceGate};
pub use conversation::{AgentReply, ConversationEngine};
pub use dispatcher::Dispatcher;
pub use intent_classifier::IntentClassifier;
pub use lifecycle::{CallLifecycle, CallSlots};
pub use outcome_recorder::OutcomeRecorder;
pub use stats::{DispatchStats, StatsSnapshot};
pub use sweeper::StaleAttemptSweeper;

use crate::config::AppConfig;

/// Every port the engine talks to, chosen once at startup
pub struct EngineContext {
    pub telephony: Arc<dyn TelephonyPort>,
    pub llm: Arc<dyn LanguageModel>,
    pub registry: Arc<dyn ComplianceRegistry>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    pub dnd: Arc<dyn DndRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub results: Arc<dyn CallResultRepository>,
    pub sinks: Vec<Arc<dyn OutcomeSink>>,
}

/// The wired dispatch engine
pub struct Engine {
    pub queue: Arc<CallQueue>,
    pub gate: Arc<ComplianceGate>,
    pub recorder: Arc<OutcomeRecorder>,
    pub slots: Arc<CallSlots>,
    pub conversations: Arc<ConversationEngine>,
    pub dispatcher: Arc<Dispatcher>,
    pub sweeper: Arc<StaleAttemptSweeper>,
    pub stats: Arc<DispatchStats>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub telephony: Arc<dyn TelephonyPort>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
    shutdown: CancellationToken,
}

impl Engine {
    pub fn build(ctx: EngineContext, config: &AppConfig, shutdown: CancellationToken) -> Self {
        let stats = Arc::new(DispatchStats::new());
        let queue = Arc::new(CallQueue::new());
        let gate = Arc::new(ComplianceGate::new(
            ctx.dnd,
            ctx.registry,
            chrono::Duration::days(config.compliance.cache_ttl_days),
            config.telephony.default_country(),
        ));
        let recorder = Arc::new(OutcomeRecorder::new(ctx.results, ctx.sinks, stats.clone()));
        let slots = Arc::new(CallSlots::new(config.dispatcher.max_concurrent_calls));
        let lifecycle = Arc::new(CallLifecycle::new(
            ctx.attempts.clone(),
            recorder.clone(),
            slots.clone(),
        ));
        let classifier = Arc::new(IntentClassifier::new(
            &config.classifier,
            Some(ctx.llm.clone()),
        ));
        let conversations = Arc::new(ConversationEngine::new(
            classifier,
            ctx.llm,
            ctx.telephony.clone(),
            gate.clone(),
            lifecycle.clone(),
            config.conversation.clone(),
            shutdown.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            queue.clone(),
            gate.clone(),
            ctx.telephony.clone(),
            ctx.attempts.clone(),
            lifecycle.clone(),
            slots.clone(),
            conversations.clone(),
            stats.clone(),
            config.dispatcher.retry_policy(),
            config.dispatcher.recheck_interval(),
        ));
        let sweeper = Arc::new(StaleAttemptSweeper::new(
            ctx.attempts.clone(),
            ctx.telephony.clone(),
            lifecycle,
            stats.clone(),
            chrono::Duration::seconds(config.dispatcher.stale_after_secs),
            config.dispatcher.sweep_interval(),
        ));

        Self {
            queue,
            gate,
            recorder,
            slots,
            conversations,
            dispatcher,
            sweeper,
            stats,
            attempts: ctx.attempts,
            telephony: ctx.telephony,
            stt: ctx.stt,
            tts: ctx.tts,
            shutdown,
        }
    }

    /// Start the dispatch loop and the sweeper
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.dispatcher.clone().start(self.shutdown.clone()),
            self.sweeper.clone().start(self.shutdown.clone()),
        ]
    }

    /// Wait for live conversations to hang up and finalize after shutdown,
    /// then finalize attempts that were still ringing
    pub async fn drain(&self, timeout: Duration) -> bool {
        let idle = self.conversations.wait_idle(timeout).await;
        match self.sweeper.reap_unanswered().await {
            Ok(0) => {}
            Ok(reaped) => info!("🧹 Finalized {} unanswered attempts on shutdown", reaped),
            Err(e) => warn!(error = %e, "Failed to finalize unanswered attempts"),
        }
        idle
    }
}
