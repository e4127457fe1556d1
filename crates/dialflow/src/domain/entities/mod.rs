//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - CallRequest: intent to call one lead once
//! - CallAttempt: one concrete dial
//! - ConversationState: per-live-call context
//! - CallResult: immutable outcome snapshot
//! - DndRecord: cached do-not-call answer
//! - QualificationData: BANT fields gathered during a call

mod call_attempt;
mod call_request;
mod call_result;
mod conversation;
mod dnd_record;
mod qualification;

pub use call_attempt::*;
pub use call_request::*;
pub use call_result::*;
pub use conversation::*;
pub use dnd_record::*;
pub use qualification::*;
