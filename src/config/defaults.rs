//! Built-in defaults for every configuration knob.

use super::{ActionEngineConfig, CacheConfig, GroundingConfig, OrchestratorConfig, RecommendationConfig};

impl Default for ActionEngineConfig {
    fn default() -> Self {
        Self {
            target_oee_percentage: 85.0,
            financial_loss_threshold: 1000.0,
            oee_high_gap_threshold: 20.0,
            oee_medium_gap_threshold: 10.0,
            financial_high_threshold: 5000.0,
            financial_medium_threshold: 2000.0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries_per_tier: 500,
            live_ttl_seconds: 60,
            daily_ttl_seconds: 900,
            static_ttl_seconds: 3600,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            plant_total_timeout_seconds: 30,
            plant_area_timeout_seconds: 4,
            eod_total_timeout_seconds: 30,
            eod_per_tool_timeout_seconds: 4,
            handoff_total_timeout_seconds: 15,
            handoff_per_tool_timeout_seconds: 10,
        }
    }
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            grounding_threshold_min: 0.6,
            grounding_threshold_high: 0.8,
            grounding_threshold_low: 0.3,
            validation_budget_ms: 200,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            minimum_data_points: 10,
            confidence_high: 0.80,
            confidence_medium: 0.60,
            max_recommendations: 3,
        }
    }
}
