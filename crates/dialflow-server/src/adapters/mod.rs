//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

pub mod llm;
pub mod memory;
pub mod registry;
pub mod sinks;
pub mod speech;

pub use llm::{NullLanguageModel, OpenAiLanguageModel};
pub use memory::{InMemoryAttemptRepository, InMemoryCallResultRepository, InMemoryDndRepository};
pub use registry::{HttpComplianceRegistry, NullComplianceRegistry};
pub use sinks::{TracingSink, WebhookSink, SIGNATURE_HEADER};
pub use speech::{HttpSpeech, NullSpeech};
