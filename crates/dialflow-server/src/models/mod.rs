//! Dialflow API Data Models
//!
//! - Calls: request intake, attempt and result views, statistics
//! - Compliance: DND blocks
//! - Telephony: vendor callback queries and agent replies

mod calls;
mod compliance;
mod telephony;

pub use calls::*;
pub use compliance::*;
pub use telephony::*;
