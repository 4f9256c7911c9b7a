//! Asset — identity of a production resource.

use serde::{Deserialize, Serialize};

/// Identity of a production resource. Immutable within a query; lifecycle
/// is owned by external ETL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub source_id: String,
    pub area: String,
    pub cost_center_id: Option<String>,
}
