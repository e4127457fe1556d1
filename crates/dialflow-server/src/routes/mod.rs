//! HTTP Routes
//!
//! - `calls`: intake, attempt and result lookups, stats (API key)
//! - `compliance`: local DND management (API key)
//! - `telephony`: vendor status and speech callbacks (open)

pub mod calls;
pub mod compliance;
pub mod telephony;
