//! CostCenter — financial rates used to translate loss into dollars.

use serde::{Deserialize, Serialize};

/// Financial rates for an area. Absence means financial calculations are
/// not possible for that asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: String,
    pub standard_hourly_rate: f64,
    pub cost_per_unit: f64,
}
