// ABOUTME: Cache abstraction for derived statistics with per-user isolation
// ABOUTME: Pluggable backend support following the EntityStore pattern
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

//! Stats cache layer. Entries are keyed by `(user, metric, window)` and
//! are never authoritative: every cached aggregate is reconstructable
//! from set/workout history, and a cold cache must reproduce identical
//! results. Lifetime is governed solely by the invalidation rules in
//! `stats`.

/// In-memory cache implementation
pub mod memory;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::cache::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CLEANUP_INTERVAL_SECS, TTL_DURATION_DISTRIBUTION_SECS,
    TTL_DURATION_HISTORY_SECS, TTL_MUSCLE_DISTRIBUTION_SECS, TTL_VOLUME_TREND_SECS,
};
use crate::errors::AppResult;

/// Cache provider trait for pluggable backend implementations
#[async_trait::async_trait]
pub trait CacheProvider: Send + Sync + Clone {
    /// Create new cache instance with configuration
    ///
    /// # Errors
    ///
    /// Returns an error if cache initialization fails
    async fn new(config: CacheConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Store value in cache with TTL
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()>;

    /// Retrieve value from cache (`None` on miss or expiry)
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>>;

    /// Remove single cache entry
    ///
    /// # Errors
    ///
    /// Returns an error if invalidation fails
    async fn invalidate(&self, key: &CacheKey) -> AppResult<()>;

    /// Remove all cache entries matching a glob pattern
    /// (e.g. `stats.volume_trend.{user}.*`). Returns the removal count.
    ///
    /// # Errors
    ///
    /// Returns an error if pattern invalidation fails
    async fn invalidate_pattern(&self, pattern: &str) -> AppResult<u64>;

    /// Check if key exists in cache
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check fails
    async fn exists(&self, key: &CacheKey) -> AppResult<bool>;

    /// Get remaining TTL for key
    ///
    /// # Errors
    ///
    /// Returns an error if the TTL check fails
    async fn ttl(&self, key: &CacheKey) -> AppResult<Option<Duration>>;

    /// Clear all cache entries (for testing/admin)
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails
    async fn clear_all(&self) -> AppResult<()>;
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (for in-memory cache)
    pub max_entries: usize,
    /// Cleanup interval for expired entries
    pub cleanup_interval: Duration,
    /// Enable background cleanup task (false in tests to avoid runtime
    /// conflicts)
    pub enable_background_cleanup: bool,
    /// Per-metric TTL configuration
    pub ttl: CacheTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
            ttl: CacheTtlConfig::default(),
        }
    }
}

/// Per-metric TTL configuration
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    /// Volume trend TTL in seconds
    pub volume_trend_secs: u64,
    /// Muscle distribution TTL in seconds
    pub muscle_distribution_secs: u64,
    /// Duration distribution TTL in seconds
    pub duration_distribution_secs: u64,
    /// Duration history TTL in seconds
    pub duration_history_secs: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            volume_trend_secs: TTL_VOLUME_TREND_SECS,
            muscle_distribution_secs: TTL_MUSCLE_DISTRIBUTION_SECS,
            duration_distribution_secs: TTL_DURATION_DISTRIBUTION_SECS,
            duration_history_secs: TTL_DURATION_HISTORY_SECS,
        }
    }
}

impl CacheTtlConfig {
    /// TTL for a specific metric
    #[must_use]
    pub const fn ttl_for_metric(&self, metric: &StatsMetric) -> Duration {
        match metric {
            StatsMetric::VolumeTrend { .. } => Duration::from_secs(self.volume_trend_secs),
            StatsMetric::MuscleDistribution { .. } => {
                Duration::from_secs(self.muscle_distribution_secs)
            }
            StatsMetric::DurationDistribution { .. } => {
                Duration::from_secs(self.duration_distribution_secs)
            }
            StatsMetric::DurationHistory { .. } => {
                Duration::from_secs(self.duration_history_secs)
            }
        }
    }
}

/// Structured cache key with per-user isolation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// User the cached aggregate belongs to
    pub user_id: Uuid,
    /// Metric and window being cached
    pub metric: StatsMetric,
}

impl CacheKey {
    /// Create new cache key
    #[must_use]
    pub const fn new(user_id: Uuid, metric: StatsMetric) -> Self {
        Self { user_id, metric }
    }

    /// Pattern matching every window of one metric for a user
    #[must_use]
    pub fn metric_pattern(user_id: Uuid, metric_name: &str) -> String {
        format!("stats.{metric_name}.{user_id}.*")
    }

    /// Pattern matching every cached stat for a user
    #[must_use]
    pub fn user_pattern(user_id: Uuid) -> String {
        format!("stats.*.{user_id}.*")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stats.{}.{}.{}",
            self.metric.name(),
            self.user_id,
            self.metric.window()
        )
    }
}

/// Cached stat metrics with their window parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsMetric {
    /// Per-workout volume series over a day window
    VolumeTrend {
        /// Window length in days
        days: u32,
    },
    /// Volume share per muscle group over a day window
    MuscleDistribution {
        /// Window length in days
        days: u32,
    },
    /// Workout duration histogram over a day window
    DurationDistribution {
        /// Window length in days
        days: u32,
    },
    /// Most recent workout durations
    DurationHistory {
        /// Maximum number of entries
        limit: u32,
    },
}

impl StatsMetric {
    /// Stable metric name used in cache keys and invalidation patterns
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::VolumeTrend { .. } => "volume_trend",
            Self::MuscleDistribution { .. } => "muscle_dist",
            Self::DurationDistribution { .. } => "duration_dist",
            Self::DurationHistory { .. } => "duration_history",
        }
    }

    /// Window parameter used as the key suffix
    #[must_use]
    pub const fn window(&self) -> u32 {
        match self {
            Self::VolumeTrend { days }
            | Self::MuscleDistribution { days }
            | Self::DurationDistribution { days } => *days,
            Self::DurationHistory { limit } => *limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        let user_id = Uuid::new_v4();
        let key = CacheKey::new(user_id, StatsMetric::VolumeTrend { days: 30 });
        assert_eq!(key.to_string(), format!("stats.volume_trend.{user_id}.30"));
    }

    #[test]
    fn test_metric_pattern_matches_all_windows() {
        let user_id = Uuid::new_v4();
        let pattern = glob::Pattern::new(&CacheKey::metric_pattern(user_id, "volume_trend"))
            .expect("valid pattern");

        let key_30 = CacheKey::new(user_id, StatsMetric::VolumeTrend { days: 30 });
        let key_90 = CacheKey::new(user_id, StatsMetric::VolumeTrend { days: 90 });
        let other_metric = CacheKey::new(user_id, StatsMetric::MuscleDistribution { days: 30 });

        assert!(pattern.matches(&key_30.to_string()));
        assert!(pattern.matches(&key_90.to_string()));
        assert!(!pattern.matches(&other_metric.to_string()));
    }

    #[test]
    fn test_user_pattern_is_user_scoped() {
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        let pattern =
            glob::Pattern::new(&CacheKey::user_pattern(user_id)).expect("valid pattern");

        let own = CacheKey::new(user_id, StatsMetric::DurationHistory { limit: 10 });
        let foreign = CacheKey::new(other_user, StatsMetric::DurationHistory { limit: 10 });

        assert!(pattern.matches(&own.to_string()));
        assert!(!pattern.matches(&foreign.to_string()));
    }
}
