//! Dialflow Domain Library
//!
//! Core domain types and interfaces for the Dialflow outbound calling engine.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (CallRequest, CallAttempt, ConversationState, CallResult, DndRecord)
//!   - `value_objects/`: Immutable value types (CallStatus, CallOutcome, Intent, ConversationStage)
//!   - `services/`: Deterministic domain rules (transition table, lead score, pattern intents, retry policy)
//!   - `errors/`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: State storage interfaces
//!   - `services/`: External service interfaces (telephony, language model, registry, speech)
//!   - `outcome_sink`: Delivery of finalized call results
//!
//! # Usage
//!
//! ```rust,ignore
//! use dialflow::domain::{CallRequest, ConversationStage};
//! use dialflow::ports::{TelephonyPort, LanguageModel};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    derive_outcome, extract_entities, extract_qualification, lead_score, lead_temperature,
    transition, CallAttempt, CallOutcome, CallRequest, CallResult, CallStatus,
    ConversationStage, ConversationState, DndCategory, DndRecord, DndSource, DomainError,
    ExtractedEntities, Intent, IntentMatch, IntentSource, LeadData, LeadTemperature,
    OutcomeSignals, PatternClassifier, QualificationData, QualificationStage, RetryDecision,
    RetryPolicy, Transition, Turn, TurnRole, PATTERN_CONFIDENCE,
};
pub use ports::{
    // Services
    ChatMessage,
    CompletionOptions,
    CompletionResponse,
    ComplianceRegistry,
    LanguageModel,
    MessageRole,
    ProviderCallStatus,
    ProviderEvent,
    RegistryAnswer,
    SpeechToText,
    TelephonyPort,
    TextToSpeech,
    TokenUsage,
    // Outcome delivery
    OutcomeSink,
    // Repositories
    AttemptRepository,
    CallResultRepository,
    DndRepository,
};
