//! DndCategory - Do-not-call registry classification

use serde::{Deserialize, Serialize};

/// Registry category attached to a number
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DndCategory {
    /// Not present in any registry
    #[default]
    NotRegistered,
    /// Blocks every commercial category
    FullyBlocked,
    /// Blocks selected commercial categories (registry-specific label)
    Partial(String),
    /// The lead asked us directly never to call again
    UserRequested,
    /// Registry could not be consulted; treated as not blocked
    Unknown,
}

impl std::fmt::Display for DndCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DndCategory::NotRegistered => write!(f, "not_registered"),
            DndCategory::FullyBlocked => write!(f, "fully_blocked"),
            DndCategory::Partial(label) => write!(f, "partial:{}", label),
            DndCategory::UserRequested => write!(f, "user_requested"),
            DndCategory::Unknown => write!(f, "unknown"),
        }
    }
}
