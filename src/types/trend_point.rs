//! TrendPoint — one sample of a gateway time series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub downtime_reasons: Option<BTreeMap<String, f64>>,
    pub asset_name: Option<String>,
}
