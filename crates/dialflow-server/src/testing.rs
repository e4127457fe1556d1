//! Test support: in-process fakes for every port and a wired engine.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dialflow::{
    AttemptRepository, CallResult, CallResultRepository, CallStatus, ChatMessage,
    CompletionOptions, CompletionResponse, ComplianceRegistry, DndCategory, DomainError,
    LanguageModel, OutcomeSink, ProviderCallStatus, RegistryAnswer, TelephonyPort, TokenUsage,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapters::{
    InMemoryAttemptRepository, InMemoryCallResultRepository, InMemoryDndRepository, NullSpeech,
};
use crate::application::{Engine, EngineContext};
use crate::config::AppConfig;

const WAIT_LIMIT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(10);

/// Telephony port that accepts every call and remembers what it was asked
#[derive(Default)]
pub struct RecordingTelephony {
    dialed: Mutex<Vec<String>>,
    placed: Mutex<Vec<Uuid>>,
    hangups: Mutex<Vec<String>>,
    remote_status: Mutex<Option<CallStatus>>,
    recording_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
}

impl RecordingTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }

    pub fn placed_attempts(&self) -> Vec<Uuid> {
        self.placed.lock().unwrap().clone()
    }

    pub fn hangups(&self) -> Vec<String> {
        self.hangups.lock().unwrap().clone()
    }

    /// Most `place_call` invocations ever in flight at once
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    /// Status reported by `get_status` from now on
    pub fn set_remote_status(&self, status: CallStatus) {
        *self.remote_status.lock().unwrap() = Some(status);
    }

    /// Make `get_recording` take this long, stretching call finalization
    pub fn delay_recordings(&self, delay: Duration) {
        *self.recording_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl TelephonyPort for RecordingTelephony {
    async fn place_call(&self, to: &str, attempt_id: Uuid) -> Result<String, DomainError> {
        self.dialed.lock().unwrap().push(to.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(5)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.placed.lock().unwrap().push(attempt_id);
        Ok(format!("CA-{}", attempt_id.simple()))
    }

    async fn hangup(&self, provider_call_id: &str) -> Result<(), DomainError> {
        self.hangups.lock().unwrap().push(provider_call_id.to_string());
        Ok(())
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<ProviderCallStatus, DomainError> {
        let status = self
            .remote_status
            .lock()
            .unwrap()
            .unwrap_or(CallStatus::Initiated);
        Ok(ProviderCallStatus {
            provider_call_id: provider_call_id.to_string(),
            status,
            duration_secs: None,
        })
    }

    async fn get_recording(&self, _provider_call_id: &str) -> Result<Option<String>, DomainError> {
        let delay = *self.recording_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Telephony port whose carrier rejects every call
#[derive(Default)]
pub struct FailingTelephony {
    attempts: AtomicUsize,
}

impl FailingTelephony {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelephonyPort for FailingTelephony {
    async fn place_call(&self, to: &str, _attempt_id: Uuid) -> Result<String, DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::ExternalService(format!(
            "carrier rejected call to {}",
            to
        )))
    }

    async fn hangup(&self, _provider_call_id: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<ProviderCallStatus, DomainError> {
        Err(DomainError::not_found_str("ProviderCall", provider_call_id))
    }

    async fn get_recording(&self, _provider_call_id: &str) -> Result<Option<String>, DomainError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Language model that replays canned replies, then answers with empty text
pub struct ScriptedLanguageModel {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    fail: bool,
}

impl ScriptedLanguageModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Every call fails as an unreachable backend would
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::ExternalService("model unavailable".to_string()));
        }
        let content = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        Ok(CompletionResponse {
            content,
            model: "scripted".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Registry with a fixed block list
pub struct StaticRegistry {
    blocked: HashSet<String>,
    fail: bool,
    lookups: AtomicUsize,
}

impl StaticRegistry {
    pub fn blocking<I, S>(phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked: phones.into_iter().map(Into::into).collect(),
            fail: false,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::blocking(Vec::<String>::new())
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComplianceRegistry for StaticRegistry {
    async fn lookup(&self, phone: &str) -> Result<RegistryAnswer, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::ExternalService("registry unreachable".to_string()));
        }
        if self.blocked.contains(phone) {
            Ok(RegistryAnswer::blocked(DndCategory::FullyBlocked))
        } else {
            Ok(RegistryAnswer::clear())
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Sink that keeps every delivered result
#[derive(Default)]
pub struct CollectingSink {
    delivered: Mutex<Vec<CallResult>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until at least `n` results arrived
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> Vec<CallResult> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let delivered = self.delivered.lock().unwrap().clone();
            if delivered.len() >= n {
                return delivered;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "only {} of {} results delivered",
                delivered.len(),
                n
            );
            tokio::time::sleep(POLL).await;
        }
    }
}

#[async_trait]
impl OutcomeSink for CollectingSink {
    fn name(&self) -> &str {
        "collecting"
    }

    async fn deliver(&self, result: &CallResult) -> Result<(), DomainError> {
        self.delivered.lock().unwrap().push(result.clone());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl OutcomeSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _result: &CallResult) -> Result<(), DomainError> {
        Err(DomainError::ExternalService("sink down".to_string()))
    }
}

/// Engine wired to in-memory state and fakes
pub struct TestBed {
    pub engine: Arc<Engine>,
    pub attempts: Arc<InMemoryAttemptRepository>,
    pub results: Arc<InMemoryCallResultRepository>,
    pub telephony: Arc<RecordingTelephony>,
    pub config: AppConfig,
    pub shutdown: CancellationToken,
}

impl TestBed {
    /// Start the dispatcher and sweeper; they stop when the bed is dropped
    pub fn start(&self) {
        self.engine.start();
    }

    /// Router state over this bed's engine
    pub fn app_state(&self) -> crate::AppState {
        crate::AppState {
            engine: self.engine.clone(),
            config: Arc::new(self.config.clone()),
        }
    }

    pub async fn wait_for_result(&self, attempt_id: Uuid) -> CallResult {
        poll(format!("result for {}", attempt_id), move || async move {
            self.engine.recorder.get(attempt_id).await.ok().flatten()
        })
        .await
    }

    pub async fn wait_for_lead_result(&self, lead_id: Uuid) -> CallResult {
        poll(format!("result for lead {}", lead_id), move || async move {
            self.results
                .find_by_lead(lead_id)
                .await
                .ok()
                .and_then(|results| results.into_iter().next())
        })
        .await
    }

    pub async fn wait_for_finalized(&self, n: u64) {
        poll(format!("{} finalized results", n), move || async move {
            (self.engine.stats.snapshot().finalized >= n).then_some(())
        })
        .await
    }

    /// Attempt ids of the first `n` calls the telephony port accepted
    pub async fn wait_for_placed(&self, n: usize) -> Vec<Uuid> {
        poll(format!("{} placed calls", n), move || async move {
            let placed = self.telephony.placed_attempts();
            (placed.len() >= n).then_some(placed)
        })
        .await
    }

    pub async fn wait_for_provider_id(&self, attempt_id: Uuid) -> String {
        poll(format!("provider call id for {}", attempt_id), move || async move {
            self.attempts
                .get(attempt_id)
                .await
                .ok()
                .flatten()
                .and_then(|a| a.provider_call_id)
        })
        .await
    }
}

impl Drop for TestBed {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn poll<T, F, Fut>(what: String, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    loop {
        if let Some(found) = attempt().await {
            return found;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {}",
            what
        );
        tokio::time::sleep(POLL).await;
    }
}

pub struct TestBedBuilder {
    config: AppConfig,
    telephony: Option<Arc<dyn TelephonyPort>>,
    registry: StaticRegistry,
    llm: Arc<dyn LanguageModel>,
}

impl TestBedBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            telephony: None,
            registry: StaticRegistry::blocking(Vec::<String>::new()),
            llm: Arc::new(ScriptedLanguageModel::new(Vec::<String>::new())),
        }
    }

    /// Dial through `telephony` instead of the recording port
    pub fn with_telephony(mut self, telephony: Arc<dyn TelephonyPort>) -> Self {
        self.telephony = Some(telephony);
        self
    }

    pub fn with_registry(mut self, registry: StaticRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_failing_llm(mut self) -> Self {
        self.llm = Arc::new(ScriptedLanguageModel::failing());
        self
    }

    pub fn configure(mut self, edit: impl FnOnce(&mut AppConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn build(self) -> TestBed {
        let recording = Arc::new(RecordingTelephony::new());
        let telephony = self
            .telephony
            .unwrap_or_else(|| recording.clone() as Arc<dyn TelephonyPort>);
        let attempts = Arc::new(InMemoryAttemptRepository::new());
        let results = Arc::new(InMemoryCallResultRepository::new());
        let shutdown = CancellationToken::new();

        let ctx = EngineContext {
            telephony,
            llm: self.llm,
            registry: Arc::new(self.registry),
            stt: Arc::new(NullSpeech::new()),
            tts: Arc::new(NullSpeech::new()),
            dnd: Arc::new(InMemoryDndRepository::new()),
            attempts: attempts.clone(),
            results: results.clone(),
            sinks: Vec::new(),
        };
        let engine = Arc::new(Engine::build(ctx, &self.config, shutdown.clone()));

        TestBed {
            engine,
            attempts,
            results,
            telephony: recording,
            config: self.config,
            shutdown,
        }
    }
}
