//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the dispatch engine
//! interacts with external systems (telephony, registries, models, sinks).
//!
//! Implementations of these traits live in the adapter crates.

pub mod outcome_sink;
pub mod repositories;
pub mod services;

// Re-exports
pub use outcome_sink::*;
pub use repositories::*;
pub use services::*;
