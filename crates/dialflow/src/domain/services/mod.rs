//! Domain Services
//!
//! Deterministic, side-effect-free rules shared by the dispatcher and the
//! conversation engine.

mod extraction;
mod outcome;
mod patterns;
mod retry;
mod scoring;
mod state_machine;

pub use extraction::*;
pub use outcome::*;
pub use patterns::*;
pub use retry::*;
pub use scoring::*;
pub use state_machine::*;
