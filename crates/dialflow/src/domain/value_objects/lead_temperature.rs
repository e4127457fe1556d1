//! LeadTemperature - Coarse readiness classification

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LeadTemperature {
    Dead,
    #[default]
    Cold,
    Warm,
    Hot,
}

impl std::fmt::Display for LeadTemperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadTemperature::Dead => write!(f, "dead"),
            LeadTemperature::Cold => write!(f, "cold"),
            LeadTemperature::Warm => write!(f, "warm"),
            LeadTemperature::Hot => write!(f, "hot"),
        }
    }
}
