//! Per-call conversation task
//!
//! One task owns one `ConversationState` for the life of the call. Inbound
//! speech, reprompts and provider hang-ups reach it as commands over a
//! channel; the task is the only writer of its state.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dialflow::{
    extract_entities, extract_qualification, lead_score, lead_temperature, transition,
    CallAttempt, CallOutcome, CallStatus, CompletionOptions, ConversationStage,
    ConversationState, DomainError, Intent, LanguageModel, OutcomeSignals, TelephonyPort,
};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::prompt;
use crate::application::compliance_gate::ComplianceGate;
use crate::application::intent_classifier::IntentClassifier;
use crate::application::lifecycle::CallLifecycle;
use crate::config::ConversationConfig;

/// What the agent says back, ready for speech synthesis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentReply {
    pub text: String,
    pub stage: ConversationStage,
    pub intent: Option<Intent>,
    /// The call should be hung up after this utterance
    pub ended: bool,
}

pub(crate) enum SessionCommand {
    Speech {
        text: String,
        reply: oneshot::Sender<AgentReply>,
    },
    Reprompt {
        reply: oneshot::Sender<AgentReply>,
    },
    End {
        status: CallStatus,
        duration_secs: Option<u64>,
        recording_url: Option<String>,
    },
}

pub(crate) struct SessionHandle {
    pub tx: mpsc::Sender<SessionCommand>,
    pub cancel: CancellationToken,
}

pub(crate) struct SessionDeps {
    pub classifier: Arc<IntentClassifier>,
    pub llm: Arc<dyn LanguageModel>,
    pub telephony: Arc<dyn TelephonyPort>,
    pub gate: Arc<ComplianceGate>,
    pub lifecycle: Arc<CallLifecycle>,
    pub config: ConversationConfig,
    pub sessions: Arc<DashMap<Uuid, SessionHandle>>,
}

enum Exit {
    /// The conversation reached `Ended` on its own
    Finished,
    /// The provider reported the call over
    ProviderEnded {
        status: CallStatus,
        duration_secs: Option<u64>,
        recording_url: Option<String>,
    },
    /// Torn down from outside (shutdown)
    Cancelled,
}

pub(crate) struct Session {
    attempt: CallAttempt,
    state: ConversationState,
    deps: Arc<SessionDeps>,
    last_line: String,
}

impl Session {
    /// New session with the opening line already on the transcript
    pub fn open(attempt: CallAttempt, deps: Arc<SessionDeps>) -> (Self, AgentReply) {
        let state = ConversationState::new(attempt.id, attempt.request.lead_id);
        let mut session = Self {
            attempt,
            state,
            deps,
            last_line: String::new(),
        };
        let opening = prompt::opening_line(&session.deps.config, &session.attempt.request);
        let reply = session.say(opening, None);
        (session, reply)
    }

    pub fn last_reply(&self) -> AgentReply {
        AgentReply {
            text: self.last_line.clone(),
            stage: self.state.stage,
            intent: None,
            ended: self.state.stage.is_ended(),
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>, cancel: CancellationToken) {
        let attempt_id = self.attempt.id;
        info!(attempt_id = %attempt_id, lead_id = %self.attempt.request.lead_id, "Conversation started");

        let exit = loop {
            let command = tokio::select! {
                _ = cancel.cancelled() => None,
                command = rx.recv() => command,
            };
            let Some(command) = command else {
                break Exit::Cancelled;
            };

            match command {
                SessionCommand::Speech { text, reply } => {
                    let answered = tokio::select! {
                        _ = cancel.cancelled() => None,
                        answered = self.respond(&text) => Some(answered),
                    };
                    let Some(answered) = answered else {
                        break Exit::Cancelled;
                    };
                    let ended = answered.ended;
                    let _ = reply.send(answered);
                    if ended {
                        break Exit::Finished;
                    }
                }
                SessionCommand::Reprompt { reply } => {
                    let _ = reply.send(self.last_reply());
                }
                SessionCommand::End {
                    status,
                    duration_secs,
                    recording_url,
                } => {
                    break Exit::ProviderEnded {
                        status,
                        duration_secs,
                        recording_url,
                    }
                }
            }
        };

        // Events arriving while the call finalizes are refused, not queued
        drop(rx);
        self.finish(exit).await;
    }

    /// Handle one lead utterance. Never fails: step errors become a
    /// clarifying line, and enough of them in a row end the call.
    async fn respond(&mut self, text: &str) -> AgentReply {
        let text = text.trim();
        let index = self.state.push_lead_turn(text);

        match self.advance(index, text).await {
            Ok((line, intent)) => {
                self.state.consecutive_errors = 0;
                self.say(line, Some(intent))
            }
            Err(e) => {
                self.state.consecutive_errors += 1;
                warn!(
                    attempt_id = %self.attempt.id,
                    stage = %self.state.stage,
                    consecutive_errors = self.state.consecutive_errors,
                    error = %e,
                    "Conversation step failed"
                );
                if self.state.consecutive_errors >= self.deps.config.max_consecutive_errors {
                    error!(attempt_id = %self.attempt.id, "Too many consecutive errors, ending call");
                    self.state.observe(CallOutcome::Failed);
                    self.state.stage = ConversationStage::Ended;
                    let line = self.deps.config.error_goodbye_utterance.clone();
                    self.say(line, None)
                } else {
                    let line = self.deps.config.clarify_utterance.clone();
                    self.say(line, None)
                }
            }
        }
    }

    async fn advance(&mut self, index: usize, text: &str) -> Result<(String, Intent), DomainError> {
        let matched = self.deps.classifier.classify(text, self.state.stage).await?;
        let intent = matched.intent;
        self.state.tag_intent(index, intent);

        let entities = extract_entities(text);
        self.state.qualification.merge(&extract_qualification(text));

        let step = transition(self.state.stage, intent);
        self.state.stage = step.to;
        if let Some(signal) = step.signal {
            self.state.observe(signal);
        }
        debug!(
            attempt_id = %self.attempt.id,
            intent = %intent,
            confidence = matched.confidence,
            from = %step.from,
            to = %step.to,
            "Turn classified"
        );

        if let Some(when) = entities.when() {
            let touches = |stage| step.from == stage || step.to == stage;
            if touches(ConversationStage::AppointmentBooking) {
                self.state.appointment_at = Some(when);
            } else if touches(ConversationStage::CallbackScheduling) {
                self.state.callback_at = Some(when);
            }
        }
        if step.booked_appointment() {
            self.state.appointment_booked = true;
        }
        if step.signal == Some(CallOutcome::Callback) {
            self.state.callback_scheduled = true;
        }
        if intent == Intent::Objection {
            self.state.objections.push(text.to_string());
        }
        if intent == Intent::DoNotCall {
            if let Err(e) = self
                .deps
                .gate
                .add_local_block(&self.attempt.request.phone, "requested during call")
                .await
            {
                error!(attempt_id = %self.attempt.id, error = %e, "Failed to record opt-out");
            }
        }

        let score = lead_score(
            &self.state.qualification,
            self.state.appointment_booked,
            self.state.callback_scheduled,
            self.state.objections.len(),
        );
        self.state.temperature = lead_temperature(&self.state.signals, score);

        let line = if self.state.stage.is_ended() {
            self.deps.config.goodbye_utterance.clone()
        } else {
            self.generate_reply().await?
        };
        Ok((line, intent))
    }

    async fn generate_reply(&self) -> Result<String, DomainError> {
        let config = &self.deps.config;
        let context = prompt::system_context(config, &self.attempt.request, &self.state);
        let history = self.state.recent_turns(config.history_turns);

        let generated = tokio::time::timeout(
            config.reply_timeout(),
            self.deps
                .llm
                .generate(&context, history, &CompletionOptions::default()),
        )
        .await
        .map_err(|_| DomainError::Timeout("reply generation".to_string()))??;

        if generated.is_empty() {
            Ok(prompt::scripted_line(config, &self.state))
        } else {
            Ok(generated)
        }
    }

    fn say(&mut self, text: String, intent: Option<Intent>) -> AgentReply {
        self.state.push_agent_turn(text.clone());
        self.last_line = text.clone();
        AgentReply {
            text,
            stage: self.state.stage,
            intent,
            ended: self.state.stage.is_ended(),
        }
    }

    async fn finish(self, exit: Exit) {
        let attempt_id = self.attempt.id;

        let talk_time = self.attempt.talk_time_secs(Utc::now());
        let (status, duration_secs, mut recording_url) = match exit {
            Exit::Finished => (CallStatus::Completed, talk_time, None),
            Exit::ProviderEnded {
                status,
                duration_secs,
                recording_url,
            } => (status, duration_secs.unwrap_or(talk_time), recording_url),
            Exit::Cancelled => {
                if let Some(provider_call_id) = &self.attempt.provider_call_id {
                    if let Err(e) = self.deps.telephony.hangup(provider_call_id).await {
                        warn!(attempt_id = %attempt_id, error = %e, "Hangup on teardown failed");
                    }
                }
                (CallStatus::Completed, talk_time, None)
            }
        };

        if recording_url.is_none() && status == CallStatus::Completed {
            if let Some(provider_call_id) = &self.attempt.provider_call_id {
                recording_url = self
                    .deps
                    .telephony
                    .get_recording(provider_call_id)
                    .await
                    .unwrap_or_else(|e| {
                        debug!(attempt_id = %attempt_id, error = %e, "No recording available");
                        None
                    });
            }
        }

        let signals = OutcomeSignals::from_conversation(
            &self.attempt.request,
            &self.state,
            status,
            duration_secs,
        )
        .with_recording(recording_url);

        match self.deps.lifecycle.close(attempt_id, signals).await {
            Ok(result) => info!(
                attempt_id = %attempt_id,
                outcome = %result.outcome,
                turns = self.state.turn_count,
                "Conversation finished"
            ),
            Err(e) => error!(attempt_id = %attempt_id, error = %e, "Failed to finalize conversation"),
        }
        // Still registered while finalizing, so a late answer sees a live call
        self.deps.sessions.remove(&attempt_id);
    }
}
