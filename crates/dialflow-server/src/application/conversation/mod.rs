//! Conversation Engine
//!
//! Drives each answered call through the stage machine. Every live call runs
//! in its own task (see `session`); the engine only routes events to it by
//! attempt id.

mod prompt;
mod session;

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dialflow::{CallAttempt, CallStatus, DomainError, LanguageModel, TelephonyPort};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

pub use session::AgentReply;
use session::{Session, SessionCommand, SessionDeps, SessionHandle};

use super::compliance_gate::ComplianceGate;
use super::intent_classifier::IntentClassifier;
use super::lifecycle::CallLifecycle;
use crate::config::ConversationConfig;

const SESSION_CHANNEL: usize = 16;

pub struct ConversationEngine {
    deps: Arc<SessionDeps>,
    shutdown: CancellationToken,
}

impl ConversationEngine {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        llm: Arc<dyn LanguageModel>,
        telephony: Arc<dyn TelephonyPort>,
        gate: Arc<ComplianceGate>,
        lifecycle: Arc<CallLifecycle>,
        config: ConversationConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            deps: Arc::new(SessionDeps {
                classifier,
                llm,
                telephony,
                gate,
                lifecycle,
                config,
                sessions: Arc::new(DashMap::new()),
            }),
            shutdown,
        }
    }

    /// Open a conversation for an answered attempt and return the opening
    /// line. Starting an attempt that is already live returns its last line.
    pub async fn start(&self, attempt: &CallAttempt) -> AgentReply {
        let (session, opening) = Session::open(attempt.clone(), self.deps.clone());
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL);
        let cancel = self.shutdown.child_token();

        let inserted = match self.deps.sessions.entry(attempt.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(SessionHandle {
                    tx,
                    cancel: cancel.clone(),
                });
                true
            }
        };

        if !inserted {
            debug!(attempt_id = %attempt.id, "Conversation already live");
            return self.reprompt(attempt.id).await.unwrap_or(opening);
        }

        tokio::spawn(session.run(rx, cancel));
        opening
    }

    /// Feed one transcribed utterance and wait for the agent's reply
    pub async fn handle_speech(
        &self,
        attempt_id: Uuid,
        text: impl Into<String>,
    ) -> Result<AgentReply, DomainError> {
        let (reply, answer) = oneshot::channel();
        self.send(
            attempt_id,
            SessionCommand::Speech {
                text: text.into(),
                reply,
            },
        )
        .await?;
        answer.await.map_err(|_| DomainError::Cancelled)
    }

    /// Last thing the agent said, for re-prompting after silence
    pub async fn reprompt(&self, attempt_id: Uuid) -> Result<AgentReply, DomainError> {
        let (reply, answer) = oneshot::channel();
        self.send(attempt_id, SessionCommand::Reprompt { reply }).await?;
        answer.await.map_err(|_| DomainError::Cancelled)
    }

    /// The provider reported the call over. Returns false if no conversation
    /// was live for the attempt.
    pub async fn end(
        &self,
        attempt_id: Uuid,
        status: CallStatus,
        duration_secs: Option<u64>,
        recording_url: Option<String>,
    ) -> bool {
        self.send(
            attempt_id,
            SessionCommand::End {
                status,
                duration_secs,
                recording_url,
            },
        )
        .await
        .is_ok()
    }

    /// Tear a single conversation down: it hangs up and finalizes
    pub fn cancel(&self, attempt_id: Uuid) -> bool {
        match self.deps.sessions.get(&attempt_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, attempt_id: Uuid) -> bool {
        self.deps.sessions.contains_key(&attempt_id)
    }

    pub fn live_count(&self) -> usize {
        self.deps.sessions.len()
    }

    /// Wait until every conversation has finalized, up to `timeout`
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.live_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        true
    }

    async fn send(&self, attempt_id: Uuid, command: SessionCommand) -> Result<(), DomainError> {
        let tx = self
            .deps
            .sessions
            .get(&attempt_id)
            .map(|handle| handle.tx.clone())
            .ok_or_else(|| DomainError::not_found("Conversation", attempt_id))?;
        tx.send(command).await.map_err(|_| DomainError::Cancelled)
    }
}
