//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod call_status;
mod dnd_category;
mod intent;
mod lead_temperature;
mod outcome;
mod stage;

pub use call_status::*;
pub use dnd_category::*;
pub use intent::*;
pub use lead_temperature::*;
pub use outcome::*;
pub use stage::*;
