//! Process-wide configuration.
//!
//! ## Loading order
//!
//! 1. `FOREMAN_CONFIG` environment variable (path to a TOML file)
//! 2. `foreman.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Individual fields are then overridable by environment variables loaded
//! via `dotenvy` (e.g. `FOREMAN_TARGET_OEE_PERCENTAGE=90`).
//!
//! ## Usage
//!
//! ```ignore
//! config::init(ForemanConfig::load());
//! let threshold = config::get().action_engine.target_oee_percentage;
//! ```
//!
//! Tests construct a `ForemanConfig` directly and pass it by dependency
//! injection rather than touching the global — see
//! [`crate::action_engine::ActionEngine::new`].

mod defaults;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Action Engine tier thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActionEngineConfig {
    pub target_oee_percentage: f64,
    pub financial_loss_threshold: f64,
    pub oee_high_gap_threshold: f64,
    pub oee_medium_gap_threshold: f64,
    pub financial_high_threshold: f64,
    pub financial_medium_threshold: f64,
}

/// Tool Response Cache configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries_per_tier: usize,
    pub live_ttl_seconds: u64,
    pub daily_ttl_seconds: u64,
    pub static_ttl_seconds: u64,
}

/// Briefing Orchestrator deadlines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    pub plant_total_timeout_seconds: u64,
    pub plant_area_timeout_seconds: u64,
    pub eod_total_timeout_seconds: u64,
    pub eod_per_tool_timeout_seconds: u64,
    pub handoff_total_timeout_seconds: u64,
    pub handoff_per_tool_timeout_seconds: u64,
}

/// Grounding Validator thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GroundingConfig {
    pub grounding_threshold_min: f64,
    pub grounding_threshold_high: f64,
    pub grounding_threshold_low: f64,
    pub validation_budget_ms: u64,
}

/// Recommendation Engine thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RecommendationConfig {
    pub minimum_data_points: usize,
    pub confidence_high: f64,
    pub confidence_medium: f64,
    pub max_recommendations: usize,
}

/// Top-level process configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForemanConfig {
    pub action_engine: ActionEngineConfig,
    pub cache: CacheConfig,
    pub orchestrator: OrchestratorConfig,
    pub grounding: GroundingConfig,
    pub recommendation: RecommendationConfig,
}

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            action_engine: ActionEngineConfig::default(),
            cache: CacheConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            grounding: GroundingConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl ForemanConfig {
    /// Load configuration following the order documented on the module.
    ///
    /// Never fails: a missing or malformed file falls back to defaults with
    /// a logged warning, since a bad config file should not prevent
    /// read-only query service from starting.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();

        let path = std::env::var("FOREMAN_CONFIG")
            .ok()
            .map(std::path::PathBuf::from)
            .filter(|p| p.exists())
            .or_else(|| {
                let cwd = Path::new("foreman.toml");
                cwd.exists().then(|| cwd.to_path_buf())
            });

        match path {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<ForemanConfig>(&contents) {
                    Ok(cfg) => cfg,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "failed to parse config file, using defaults");
                        Self::default()
                    }
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to read config file, using defaults");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}

/// Global configuration, initialized once at startup.
static FOREMAN_CONFIG: OnceLock<ArcSwap<ForemanConfig>> = OnceLock::new();

/// Initialize the global configuration.
///
/// Safe to call more than once; later calls are logged and ignored, the
/// first call wins. Use [`reload`] to change configuration after startup.
pub fn init(config: ForemanConfig) {
    if FOREMAN_CONFIG.set(ArcSwap::from_pointee(config)).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get the current global configuration.
///
/// Panics if [`init`] has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> std::sync::Arc<ForemanConfig> {
    FOREMAN_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
        .load_full()
}

/// Hot-swap the global configuration without a restart.
///
/// Used when an operator pushes new thresholds; any in-flight orchestrator
/// call keeps the `Arc` it already loaded (last writer wins, consistent
/// with the Action Engine's asset-map reload policy).
pub fn reload(config: ForemanConfig) {
    match FOREMAN_CONFIG.get() {
        Some(slot) => slot.store(std::sync::Arc::new(config)),
        None => init(config),
    }
}

/// Whether the global configuration has been initialized.
pub fn is_initialized() -> bool {
    FOREMAN_CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ForemanConfig::default();
        assert_eq!(cfg.action_engine.target_oee_percentage, 85.0);
        assert_eq!(cfg.action_engine.financial_loss_threshold, 1000.0);
        assert_eq!(cfg.cache.live_ttl_seconds, 60);
        assert_eq!(cfg.cache.daily_ttl_seconds, 900);
        assert_eq!(cfg.cache.static_ttl_seconds, 3600);
        assert_eq!(cfg.grounding.grounding_threshold_min, 0.6);
        assert_eq!(cfg.grounding.grounding_threshold_high, 0.8);
        assert_eq!(cfg.grounding.grounding_threshold_low, 0.3);
        assert_eq!(cfg.recommendation.minimum_data_points, 10);
        assert_eq!(cfg.recommendation.max_recommendations, 3);
    }

    #[test]
    fn load_falls_back_to_defaults_without_a_file() {
        // No FOREMAN_CONFIG set, and this test does not chdir to a
        // directory containing foreman.toml, so defaults apply.
        std::env::remove_var("FOREMAN_CONFIG");
        let cfg = ForemanConfig::load();
        assert_eq!(cfg, ForemanConfig::default());
    }
}
