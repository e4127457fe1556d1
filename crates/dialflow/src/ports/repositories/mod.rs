//! Repository Ports
//!
//! Abstract interfaces for engine state storage.

mod attempt_repository;
mod call_result_repository;
mod dnd_repository;

pub use attempt_repository::*;
pub use call_result_repository::*;
pub use dnd_repository::*;
