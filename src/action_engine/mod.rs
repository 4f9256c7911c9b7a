//! Action Prioritization Engine — deterministic cross-tier action ranking.

use crate::config::ActionEngineConfig;
use crate::gateway::DataSourceGateway;
use crate::ids;
use crate::types::{
    ActionCategory, ActionItem, ActionListResponse, Asset, CountsByCategory, EvidenceRef, PriorityLevel, SafetyEvent,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const ASSET_CACHE_TTL_SECONDS: i64 = 300;

struct AssetCache {
    loaded_at: DateTime<Utc>,
    assets: HashMap<String, Asset>,
}

/// Produces, for a given report date, a deterministic list of operational
/// issues to act on. Owns an in-process 5-minute asset map cache and an
/// action-list cache keyed `"<report_date>-<category|all>"`.
pub struct ActionPrioritizationEngine<G: DataSourceGateway + ?Sized> {
    gateway: Arc<G>,
    default_config: ActionEngineConfig,
    asset_cache: RwLock<Option<AssetCache>>,
    action_list_cache: DashMap<String, ActionListResponse>,
}

impl<G: DataSourceGateway + ?Sized> ActionPrioritizationEngine<G> {
    pub fn new(gateway: Arc<G>, default_config: ActionEngineConfig) -> Self {
        Self { gateway, default_config, asset_cache: RwLock::new(None), action_list_cache: DashMap::new() }
    }

    async fn load_assets(&self) -> HashMap<String, Asset> {
        {
            let cache = self.asset_cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if (Utc::now() - entry.loaded_at) < Duration::seconds(ASSET_CACHE_TTL_SECONDS) {
                    return entry.assets.clone();
                }
            }
        }

        let assets = match self.gateway.get_all_assets().await {
            Ok(result) => result.rows().iter().map(|a| (a.id.clone(), a.clone())).collect(),
            Err(err) => {
                tracing::error!(error = %err, "failed to load assets for action engine");
                HashMap::new()
            }
        };

        let mut cache = self.asset_cache.write().await;
        *cache = Some(AssetCache { loaded_at: Utc::now(), assets: assets.clone() });
        assets
    }

    pub async fn generate_action_list(
        &self,
        target_date: Option<NaiveDate>,
        limit: Option<usize>,
        category_filter: Option<ActionCategory>,
        use_cache: bool,
        config_override: Option<ActionEngineConfig>,
    ) -> ActionListResponse {
        let target_date = target_date.unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));
        let cache_key = action_list_cache_key(target_date, category_filter);

        if use_cache && config_override.is_none() {
            if let Some(cached) = self.action_list_cache.get(&cache_key) {
                return apply_limit(cached.clone(), limit);
            }
        }

        let config = config_override.unwrap_or(self.default_config);
        let assets_map = self.load_assets().await;

        let safety_actions = self.get_safety_actions(target_date, &assets_map).await;
        let oee_actions = self.get_oee_actions(target_date, &assets_map, &config).await;
        let financial_actions = self.get_financial_actions(target_date, &assets_map, &config).await;

        let merged = match category_filter {
            Some(ActionCategory::Safety) => safety_actions,
            Some(ActionCategory::Oee) => oee_actions,
            Some(ActionCategory::Financial) => financial_actions,
            None => merge_and_prioritize(safety_actions, oee_actions, financial_actions),
        };

        let counts_by_category = count_by_category(&merged);
        let total_count = merged.len();
        let actions = match limit {
            Some(limit) if merged.len() > limit => merged[..limit].to_vec(),
            _ => merged,
        };

        let response = ActionListResponse { report_date: target_date, actions, total_count, counts_by_category, generated_at: Utc::now() };

        if category_filter.is_none() {
            self.action_list_cache.insert(cache_key, response.clone());
        }

        response
    }

    /// Removes cached entries for `target_date`, or every entry if `None`.
    pub fn invalidate(&self, target_date: Option<NaiveDate>) {
        match target_date {
            Some(date) => {
                let prefix = date.to_string();
                self.action_list_cache.retain(|k, _| !k.starts_with(&prefix));
            }
            None => self.action_list_cache.clear(),
        }
    }

    async fn get_safety_actions(&self, target_date: NaiveDate, assets_map: &HashMap<String, Asset>) -> Vec<ActionItem> {
        let start = crate::time_range::start_of_day(target_date).and_utc();

        let events = match self.gateway.get_safety_events(None, target_date, target_date, false, None, None).await {
            Ok(result) => result.rows().to_vec(),
            Err(err) => {
                tracing::warn!(error = %err, "safety tier degraded to empty list");
                return Vec::new();
            }
        };

        let mut scored: Vec<(ActionItem, SafetyEvent)> = events
            .into_iter()
            .filter(|e| e.event_timestamp >= start)
            .map(|event| {
                let asset_name = assets_map.get(&event.asset_id).map_or_else(|| "Unknown".to_string(), |a| a.name.clone());
                let time_str = event.event_timestamp.format("%H:%M").to_string();
                let item = ActionItem {
                    id: ids::generate("action-safety"),
                    asset_id: event.asset_id.clone(),
                    asset_name,
                    priority_level: PriorityLevel::Critical,
                    category: ActionCategory::Safety,
                    primary_metric_value: format!("Safety Event: {}", event.reason_code),
                    recommendation_text: format!("Investigate {} on asset {}", event.reason_code.to_lowercase(), event.asset_id),
                    evidence_summary: format!("Unresolved safety event at {time_str}"),
                    evidence_refs: vec![EvidenceRef {
                        source_table: "safety_events".into(),
                        record_id: event.id.clone(),
                        metric_name: "severity".into(),
                        metric_value: format!("{:?}", event.severity).to_lowercase(),
                        context: Some(if event.description.is_empty() {
                            format!("Safety event: {}", event.reason_code)
                        } else {
                            event.description.clone()
                        }),
                    }],
                    created_at: Utc::now(),
                };
                (item, event)
            })
            .collect();

        // Group by severity rank ascending, then within each group sort by
        // event_timestamp descending (newest first) — not a single tuple sort.
        scored.sort_by_key(|(_, e)| e.severity.rank());
        let mut result = Vec::with_capacity(scored.len());
        let mut i = 0;
        while i < scored.len() {
            let rank = scored[i].1.severity.rank();
            let mut j = i;
            while j < scored.len() && scored[j].1.severity.rank() == rank {
                j += 1;
            }
            let mut group: Vec<(ActionItem, SafetyEvent)> = scored[i..j].to_vec();
            group.sort_by(|a, b| b.1.event_timestamp.cmp(&a.1.event_timestamp));
            result.extend(group.into_iter().map(|(item, _)| item));
            i = j;
        }
        result
    }

    async fn get_oee_actions(
        &self,
        target_date: NaiveDate,
        assets_map: &HashMap<String, Asset>,
        config: &ActionEngineConfig,
    ) -> Vec<ActionItem> {
        let rows = match self.gateway.get_daily_summaries_for_date(target_date).await {
            Ok(result) => result.rows().to_vec(),
            Err(err) => {
                tracing::warn!(error = %err, "oee tier degraded to empty list");
                return Vec::new();
            }
        };
        let mut scored: Vec<(ActionItem, f64)> = rows
            .into_iter()
            .filter_map(|summary| {
                let oee = summary.oee_percentage?;
                if oee >= config.target_oee_percentage {
                    return None;
                }
                let gap = config.target_oee_percentage - oee;
                let priority = if gap >= config.oee_high_gap_threshold {
                    PriorityLevel::High
                } else if gap >= config.oee_medium_gap_threshold {
                    PriorityLevel::Medium
                } else {
                    PriorityLevel::Low
                };
                let asset_name = assets_map.get(&summary.asset_id).map_or_else(|| "Unknown".to_string(), |a| a.name.clone());
                let item = ActionItem {
                    id: ids::generate("action-oee"),
                    asset_id: summary.asset_id.clone(),
                    asset_name: asset_name.clone(),
                    priority_level: priority,
                    category: ActionCategory::Oee,
                    primary_metric_value: format!("OEE: {oee:.1}%"),
                    recommendation_text: format!("Review performance on {asset_name} - {gap:.1}% below target"),
                    evidence_summary: format!("OEE {gap:.1}% below {:.1}% target", config.target_oee_percentage),
                    evidence_refs: vec![EvidenceRef {
                        source_table: "daily_summaries".into(),
                        record_id: summary.id.clone(),
                        metric_name: "oee_gap".into(),
                        metric_value: format!("{gap:.1}%"),
                        context: Some(format!("OEE {oee:.1}% vs target {:.1}%", config.target_oee_percentage)),
                    }],
                    created_at: Utc::now(),
                };
                Some((item, gap))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(item, _)| item).collect()
    }

    async fn get_financial_actions(
        &self,
        target_date: NaiveDate,
        assets_map: &HashMap<String, Asset>,
        config: &ActionEngineConfig,
    ) -> Vec<ActionItem> {
        let rows = match self.gateway.get_financial_metrics(target_date, target_date, None, None).await {
            Ok(result) => result.rows().to_vec(),
            Err(err) => {
                tracing::warn!(error = %err, "financial tier degraded to empty list");
                return Vec::new();
            }
        };

        let mut scored: Vec<(ActionItem, f64)> = rows
            .into_iter()
            .filter_map(|record| {
                let loss = record.total_cost()?;
                if loss <= config.financial_loss_threshold {
                    return None;
                }
                let priority = if loss >= config.financial_high_threshold {
                    PriorityLevel::High
                } else if loss >= config.financial_medium_threshold {
                    PriorityLevel::Medium
                } else {
                    PriorityLevel::Low
                };
                let asset_name = assets_map.get(&record.asset_id).map_or_else(|| record.asset_name.clone(), |a| a.name.clone());
                let item = ActionItem {
                    id: ids::generate("action-financial"),
                    asset_id: record.asset_id.clone(),
                    asset_name: asset_name.clone(),
                    priority_level: priority,
                    category: ActionCategory::Financial,
                    primary_metric_value: format!("Loss: ${loss:.2}"),
                    recommendation_text: format!("Reduce losses on {asset_name}"),
                    evidence_summary: format!("Financial loss ${loss:.2} above ${:.2} threshold", config.financial_loss_threshold),
                    evidence_refs: vec![EvidenceRef {
                        source_table: "daily_summaries".into(),
                        record_id: format!("{}-{}", record.asset_id, record.report_date),
                        metric_name: "financial_loss".into(),
                        metric_value: format!("${loss:.2}"),
                        context: Some(format!("Downtime: {}min, Waste: {} units", record.downtime_minutes, record.waste_count)),
                    }],
                    created_at: Utc::now(),
                };
                Some((item, loss))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(item, _)| item).collect()
    }
}

fn action_list_cache_key(date: NaiveDate, category_filter: Option<ActionCategory>) -> String {
    let category = match category_filter {
        Some(ActionCategory::Safety) => "safety",
        Some(ActionCategory::Oee) => "oee",
        Some(ActionCategory::Financial) => "financial",
        None => "all",
    };
    format!("{date}-{category}")
}

fn apply_limit(response: ActionListResponse, limit: Option<usize>) -> ActionListResponse {
    match limit {
        Some(limit) if response.actions.len() > limit => {
            ActionListResponse { actions: response.actions[..limit].to_vec(), ..response }
        }
        _ => response,
    }
}

fn count_by_category(actions: &[ActionItem]) -> CountsByCategory {
    let mut counts = CountsByCategory::default();
    for action in actions {
        match action.category {
            ActionCategory::Safety => counts.safety += 1,
            ActionCategory::Oee => counts.oee += 1,
            ActionCategory::Financial => counts.financial += 1,
        }
    }
    counts
}

/// Safety ≻ OEE ≻ Financial. A duplicate asset collapses into the
/// highest-tier item seen so far; evidence from later tiers is appended,
/// never dropped.
fn merge_and_prioritize(safety: Vec<ActionItem>, oee: Vec<ActionItem>, financial: Vec<ActionItem>) -> Vec<ActionItem> {
    let mut result: Vec<ActionItem> = Vec::new();
    let mut index_by_asset: HashMap<String, usize> = HashMap::new();

    for tier in [safety, oee, financial] {
        for action in tier {
            if let Some(&idx) = index_by_asset.get(&action.asset_id) {
                result[idx].evidence_refs.extend(action.evidence_refs);
            } else {
                index_by_asset.insert(action.asset_id.clone(), result.len());
                result.push(action);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use chrono::TimeZone;

    fn action(asset_id: &str, category: ActionCategory) -> ActionItem {
        ActionItem {
            id: "a".into(),
            asset_id: asset_id.into(),
            asset_name: "Line".into(),
            priority_level: PriorityLevel::Critical,
            category,
            primary_metric_value: "x".into(),
            recommendation_text: "x".into(),
            evidence_summary: "x".into(),
            evidence_refs: vec![EvidenceRef {
                source_table: "t".into(),
                record_id: "r".into(),
                metric_name: "m".into(),
                metric_value: "v".into(),
                context: None,
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn merge_keeps_highest_tier_and_appends_evidence() {
        let safety = vec![action("a1", ActionCategory::Safety)];
        let oee = vec![action("a1", ActionCategory::Oee), action("a2", ActionCategory::Oee)];
        let financial = vec![action("a1", ActionCategory::Financial)];

        let merged = merge_and_prioritize(safety, oee, financial);
        assert_eq!(merged.len(), 2);
        let a1 = merged.iter().find(|a| a.asset_id == "a1").expect("a1 present");
        assert_eq!(a1.category, ActionCategory::Safety);
        assert_eq!(a1.evidence_refs.len(), 3);
    }

    fn event(asset_id: &str, severity: Severity, hour: u32) -> SafetyEvent {
        SafetyEvent {
            id: format!("{asset_id}-{hour}"),
            asset_id: asset_id.into(),
            event_timestamp: Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).single().expect("valid timestamp"),
            reason_code: "jam".into(),
            severity,
            description: String::new(),
            is_resolved: false,
            resolved_at: None,
        }
    }

    #[test]
    fn safety_grouped_sort_orders_by_severity_then_recency_within_group() {
        let events = vec![
            event("a1", Severity::High, 8),
            event("a2", Severity::Critical, 6),
            event("a3", Severity::Critical, 10),
        ];
        let mut with_rank: Vec<_> = events.into_iter().collect();
        with_rank.sort_by_key(|e| e.severity.rank());
        let mut ordered: Vec<SafetyEvent> = Vec::new();
        let mut i = 0;
        while i < with_rank.len() {
            let rank = with_rank[i].severity.rank();
            let mut j = i;
            while j < with_rank.len() && with_rank[j].severity.rank() == rank {
                j += 1;
            }
            let mut group = with_rank[i..j].to_vec();
            group.sort_by(|a, b| b.event_timestamp.cmp(&a.event_timestamp));
            ordered.extend(group);
            i = j;
        }
        assert_eq!(ordered[0].asset_id, "a3");
        assert_eq!(ordered[1].asset_id, "a2");
        assert_eq!(ordered[2].asset_id, "a1");
    }

    #[test]
    fn cache_key_reflects_category_filter() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        assert_eq!(action_list_cache_key(date, None), "2026-01-01-all");
        assert_eq!(action_list_cache_key(date, Some(ActionCategory::Safety)), "2026-01-01-safety");
    }
}
