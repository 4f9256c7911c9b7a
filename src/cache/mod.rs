//! Tool Response Cache — tiered TTL cache wrapping capability-tool outputs.

pub mod key;
pub mod stats;

pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::config::CacheConfig;
use crate::types::ToolResult;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Live,
    Daily,
    Static,
    /// Honored but never cached.
    None,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Live => "live",
            Tier::Daily => "daily",
            Tier::Static => "static",
            Tier::None => "none",
        }
    }

    pub fn ttl_seconds(self, config: &CacheConfig) -> u64 {
        match self {
            Tier::Live => config.live_ttl_seconds,
            Tier::Daily => config.daily_ttl_seconds,
            Tier::Static => config.static_ttl_seconds,
            Tier::None => 0,
        }
    }
}

struct CachedEntry {
    value: ToolResult,
    tier: Tier,
    inserted_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

/// Decorator cache sitting in front of every capability tool. Entries are
/// keyed by [`key::build`]; eviction is LRU per tier once
/// `max_entries_per_tier` is exceeded.
pub struct ToolCache {
    entries: DashMap<String, CachedEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl ToolCache {
    pub fn new(config: CacheConfig) -> Self {
        Self { entries: DashMap::new(), config, stats: CacheStats::default() }
    }

    /// A hit returns a *copy* of the stored value with `cached_at`/`cache_tier`
    /// refreshed; a disabled cache always misses without touching stats.
    pub fn get(&self, cache_key: &str) -> Option<ToolResult> {
        if !self.config.enabled {
            return None;
        }

        let now = Utc::now();
        let mut expired = false;
        let hit = self.entries.get_mut(cache_key).and_then(|mut entry| {
            let ttl = entry.tier.ttl_seconds(&self.config);
            if (now - entry.inserted_at).num_seconds() as u64 > ttl {
                expired = true;
                return None;
            }
            entry.last_accessed = now;
            let mut value = entry.value.clone();
            value.metadata.cached_at = Some(now);
            value.metadata.cache_tier = Some(entry.tier.as_str().to_string());
            Some(value)
        });

        if expired {
            self.entries.remove(cache_key);
        }

        match hit {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Stores the raw value under `tier`. A `Tier::None` write is a no-op,
    /// matching the "never cached" contract for that tier.
    pub fn set(&self, cache_key: &str, tier: Tier, value: ToolResult) {
        if !self.config.enabled || matches!(tier, Tier::None) {
            return;
        }

        let now = Utc::now();
        self.entries.insert(cache_key.to_string(), CachedEntry { value, tier, inserted_at: now, last_accessed: now });
        self.evict_if_over_capacity(tier);
    }

    fn evict_if_over_capacity(&self, tier: Tier) {
        let cap = self.config.max_entries_per_tier;
        loop {
            let in_tier: usize = self.entries.iter().filter(|e| e.tier == tier).count();
            if in_tier <= cap {
                break;
            }
            let oldest_key = self
                .entries
                .iter()
                .filter(|e| e.tier == tier)
                .min_by_key(|e| e.last_accessed)
                .map(|e| e.key().clone());
            match oldest_key {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn invalidate_tier(&self, tier: Tier) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.tier != tier);
        if self.entries.len() != before {
            self.stats.record_invalidation();
        }
    }

    /// `tool_name` is the first `:`-delimited segment of every key.
    pub fn invalidate_tool(&self, tool_name: &str) {
        let prefix = format!("{tool_name}:");
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        if self.entries.len() != before {
            self.stats.record_invalidation();
        }
    }

    /// Glob match (`*` wildcard only) against the key tail after the first
    /// two `:`-delimited segments.
    pub fn invalidate_glob(&self, pattern: &str) {
        let regex = glob_to_regex(pattern);
        let before = self.entries.len();
        self.entries.retain(|k, _| {
            let tail = k.splitn(3, ':').nth(2).unwrap_or(k);
            !regex.is_match(tail)
        });
        if self.entries.len() != before {
            self.stats.record_invalidation();
        }
    }

    pub fn invalidate_all(&self) {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        if had_entries {
            self.stats.record_invalidation();
        }
    }

    pub fn stats_snapshot(&self) -> CacheStatsSnapshot {
        let mut entries_by_tier: BTreeMap<String, usize> = BTreeMap::new();
        for entry in self.entries.iter() {
            *entries_by_tier.entry(entry.tier.as_str().to_string()).or_insert(0) += 1;
        }
        CacheStatsSnapshot {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            invalidations: self.stats.invalidations(),
            hit_rate: self.stats.hit_rate(),
            entries_by_tier,
        }
    }
}

fn glob_to_regex(pattern: &str) -> regex::Regex {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('^');
    for segment in pattern.split('*') {
        if !escaped.ends_with('^') {
            escaped.push_str(".*");
        }
        escaped.push_str(&regex::escape(segment));
    }
    escaped.push('$');
    regex::Regex::new(&escaped).unwrap_or_else(|_| regex::Regex::new("$^").expect("empty-match regex is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolMetadata;
    use serde_json::json;

    fn sample_result() -> ToolResult {
        ToolResult::ok(json!({"oee": 72.0}), vec![], ToolMetadata::new(Utc::now()))
    }

    #[test]
    fn miss_then_hit_after_set() {
        let cache = ToolCache::new(CacheConfig::default());
        assert!(cache.get("oee:u1:abc").is_none());
        cache.set("oee:u1:abc", Tier::Daily, sample_result());
        let hit = cache.get("oee:u1:abc").expect("should be cached");
        assert_eq!(hit.metadata.cache_tier.as_deref(), Some("daily"));
        assert!(hit.metadata.cached_at.is_some());
        assert_eq!(cache.stats_snapshot().hits, 1);
        assert_eq!(cache.stats_snapshot().misses, 1);
    }

    #[test]
    fn none_tier_is_never_cached() {
        let cache = ToolCache::new(CacheConfig::default());
        cache.set("alerts:u1:abc", Tier::None, sample_result());
        assert!(cache.get("alerts:u1:abc").is_none());
    }

    #[test]
    fn disabled_cache_is_always_a_no_op() {
        let mut config = CacheConfig::default();
        config.enabled = false;
        let cache = ToolCache::new(config);
        cache.set("oee:u1:abc", Tier::Daily, sample_result());
        assert!(cache.get("oee:u1:abc").is_none());
        assert_eq!(cache.stats_snapshot().hits, 0);
        assert_eq!(cache.stats_snapshot().misses, 0);
    }

    #[test]
    fn invalidate_tool_removes_only_matching_prefix() {
        let cache = ToolCache::new(CacheConfig::default());
        cache.set("oee:u1:abc", Tier::Daily, sample_result());
        cache.set("downtime:u1:abc", Tier::Daily, sample_result());
        cache.invalidate_tool("oee");
        assert!(cache.get("oee:u1:abc").is_none());
        assert_eq!(cache.stats_snapshot().entries_by_tier.get("daily").copied().unwrap_or(0), 1);
    }

    #[test]
    fn invalidate_glob_matches_key_tail() {
        let cache = ToolCache::new(CacheConfig::default());
        cache.set("action_list:u1:2026-01-01-safety", Tier::Daily, sample_result());
        cache.set("action_list:u1:2026-01-02-safety", Tier::Daily, sample_result());
        cache.invalidate_glob("2026-01-01*");
        assert!(cache.get("action_list:u1:2026-01-01-safety").is_none());
        assert!(cache.get("action_list:u1:2026-01-02-safety").is_some());
    }

    #[test]
    fn lru_eviction_drops_least_recently_used_in_tier() {
        let mut config = CacheConfig::default();
        config.max_entries_per_tier = 2;
        let cache = ToolCache::new(config);
        cache.set("oee:u1:a", Tier::Daily, sample_result());
        cache.set("oee:u1:b", Tier::Daily, sample_result());
        cache.get("oee:u1:a");
        cache.set("oee:u1:c", Tier::Daily, sample_result());
        assert!(cache.get("oee:u1:a").is_some());
        assert!(cache.get("oee:u1:c").is_some());
        assert!(cache.get("oee:u1:b").is_none());
    }
}
