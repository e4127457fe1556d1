//! Service Ports
//!
//! Abstract interfaces for external services.

mod compliance_registry;
mod llm_provider;
mod speech;
mod telephony;

pub use compliance_registry::*;
pub use llm_provider::*;
pub use speech::*;
pub use telephony::*;
