// ABOUTME: Cache-backed statistics queries and the selective cache invalidator
// ABOUTME: Volume trend, muscle distribution, duration distribution and history
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! Stats Service
//!
//! Read-side aggregates consumed by the rendering layer, cached per
//! `(user, metric, window)`. The cache is purely an optimization: a cold
//! cache recomputes identical results from the entity store, and cache
//! failures degrade to "always recompute" without surfacing errors.
//!
//! Invalidation is selective and exact:
//! - `started_at`/`ended_at` changed — every windowed stat for the user
//!   (date bucketing depends on these)
//! - `name` changed — only metrics that surface the name (volume trend)
//! - `notes` changed alone — nothing
//! - set weight/reps changed — volume trend and muscle distribution
//!   (duration stats depend only on timestamps)

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cache::{CacheKey, CacheProvider, CacheTtlConfig, StatsMetric};
use crate::constants::DURATION_BUCKET_UPPER_BOUNDS_MIN;
use crate::errors::{AppError, AppResult};
use crate::models::{User, Workout, WorkoutChanges};
use crate::store::EntityStore;

/// One point of the volume trend: a workout's date, name, and volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Local calendar day of the workout
    pub date: NaiveDate,
    /// Workout name (the only stat surfacing it)
    pub label: String,
    /// Workout volume in kg
    pub value: f64,
}

/// One slice of a distribution: label and value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSlice {
    /// Slice label (muscle group or duration bucket)
    pub label: String,
    /// Slice value (volume in kg, or workout count)
    pub value: f64,
}

/// One entry of the duration history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPoint {
    /// Local calendar day of the workout
    pub date: NaiveDate,
    /// Session length in minutes
    pub value: i64,
}

/// Cache-backed statistics over the entity store
#[derive(Clone)]
pub struct StatsService<S: EntityStore, C: CacheProvider> {
    store: S,
    cache: C,
    ttl: CacheTtlConfig,
}

impl<S: EntityStore, C: CacheProvider> StatsService<S, C> {
    /// Create a stats service over the given store and cache
    pub const fn new(store: S, cache: C, ttl: CacheTtlConfig) -> Self {
        Self { store, cache, ttl }
    }

    /// Per-workout volume series over the last `days` days, oldest first
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and a storage
    /// error when the history read fails. Cache failures never surface.
    pub async fn volume_trend(&self, user_id: Uuid, days: u32) -> AppResult<Vec<TrendPoint>> {
        let metric = StatsMetric::VolumeTrend { days };
        let key = CacheKey::new(user_id, metric);
        if let Some(cached) = self.read_cache::<Vec<TrendPoint>>(&key).await {
            return Ok(cached);
        }

        let user = self.require_user(user_id).await?;
        let points: Vec<TrendPoint> = self
            .windowed_workouts(user_id, days)
            .await?
            .iter()
            .map(|workout| TrendPoint {
                date: user.local_date(workout.started_at),
                label: workout.name.clone(),
                value: workout.volume_kg,
            })
            .collect();

        self.write_cache(&key, &points).await;
        Ok(points)
    }

    /// Volume share per muscle group over the last `days` days, ordered
    /// by muscle group
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and a storage
    /// error when history reads fail. Cache failures never surface.
    pub async fn muscle_distribution(
        &self,
        user_id: Uuid,
        days: u32,
    ) -> AppResult<Vec<DistributionSlice>> {
        let metric = StatsMetric::MuscleDistribution { days };
        let key = CacheKey::new(user_id, metric);
        if let Some(cached) = self.read_cache::<Vec<DistributionSlice>>(&key).await {
            return Ok(cached);
        }

        self.require_user(user_id).await?;
        let mut by_group: BTreeMap<String, f64> = BTreeMap::new();

        for workout in self.windowed_workouts(user_id, days).await? {
            let sets = self
                .store
                .list_workout_sets(workout.id)
                .await
                .map_err(AppError::from)?;
            for line in self
                .store
                .list_workout_lines(workout.id)
                .await
                .map_err(AppError::from)?
            {
                let Some(exercise) = self
                    .store
                    .get_exercise(line.exercise_id)
                    .await
                    .map_err(AppError::from)?
                else {
                    debug!(exercise_id = %line.exercise_id, "exercise missing, line skipped in distribution");
                    continue;
                };
                let line_volume: f64 = sets
                    .iter()
                    .filter(|set| set.workout_line_id == line.id)
                    .map(crate::models::Set::volume_kg)
                    .sum();
                *by_group
                    .entry(exercise.muscle_group.as_str().to_owned())
                    .or_insert(0.0) += line_volume;
            }
        }

        let slices: Vec<DistributionSlice> = by_group
            .into_iter()
            .map(|(label, value)| DistributionSlice { label, value })
            .collect();

        self.write_cache(&key, &slices).await;
        Ok(slices)
    }

    /// Histogram of finished-workout durations over the last `days`
    /// days, bucketed in minutes
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and a storage
    /// error when the history read fails. Cache failures never surface.
    pub async fn duration_distribution(
        &self,
        user_id: Uuid,
        days: u32,
    ) -> AppResult<Vec<DistributionSlice>> {
        let metric = StatsMetric::DurationDistribution { days };
        let key = CacheKey::new(user_id, metric);
        if let Some(cached) = self.read_cache::<Vec<DistributionSlice>>(&key).await {
            return Ok(cached);
        }

        self.require_user(user_id).await?;
        let mut counts = vec![0u32; DURATION_BUCKET_UPPER_BOUNDS_MIN.len() + 1];

        for workout in self.windowed_workouts(user_id, days).await? {
            let Some(duration) = workout.duration() else {
                continue;
            };
            let minutes = duration.num_minutes();
            let bucket = DURATION_BUCKET_UPPER_BOUNDS_MIN
                .iter()
                .position(|&bound| minutes < bound)
                .unwrap_or(DURATION_BUCKET_UPPER_BOUNDS_MIN.len());
            counts[bucket] += 1;
        }

        let slices: Vec<DistributionSlice> = counts
            .iter()
            .enumerate()
            .map(|(index, &count)| DistributionSlice {
                label: bucket_label(index),
                value: f64::from(count),
            })
            .collect();

        self.write_cache(&key, &slices).await;
        Ok(slices)
    }

    /// The `limit` most recent finished workouts' durations, newest
    /// first
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and a storage
    /// error when the history read fails. Cache failures never surface.
    pub async fn duration_history(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<DurationPoint>> {
        let metric = StatsMetric::DurationHistory { limit };
        let key = CacheKey::new(user_id, metric);
        if let Some(cached) = self.read_cache::<Vec<DurationPoint>>(&key).await {
            return Ok(cached);
        }

        let user = self.require_user(user_id).await?;
        let mut workouts = self
            .store
            .list_user_workouts(user_id)
            .await
            .map_err(AppError::from)?;
        workouts.reverse();

        let points: Vec<DurationPoint> = workouts
            .iter()
            .filter_map(|workout| {
                workout.duration().map(|duration| DurationPoint {
                    date: user.local_date(workout.started_at),
                    value: duration.num_minutes(),
                })
            })
            .take(limit as usize)
            .collect();

        self.write_cache(&key, &points).await;
        Ok(points)
    }

    // ================================
    // Invalidation
    // ================================

    /// Apply the workout field-change → invalidation mapping.
    /// Best-effort: a failing cache degrades to recompute-on-read.
    pub async fn invalidate_for_workout_update(&self, user_id: Uuid, changes: WorkoutChanges) {
        if changes.intersects(WorkoutChanges::STARTED_AT | WorkoutChanges::ENDED_AT) {
            // Date bucketing depends on the timestamps: drop everything
            self.invalidate_pattern(&CacheKey::user_pattern(user_id))
                .await;
        } else if changes.contains(WorkoutChanges::NAME) {
            // Only the volume trend surfaces the name
            self.invalidate_pattern(&CacheKey::metric_pattern(user_id, "volume_trend"))
                .await;
        }
        // Notes-only changes invalidate nothing
    }

    /// Invalidate the stats affected by a set weight/reps change.
    /// Duration stats depend only on timestamps and are left in place.
    pub async fn invalidate_for_set_change(&self, user_id: Uuid) {
        self.invalidate_pattern(&CacheKey::metric_pattern(user_id, "volume_trend"))
            .await;
        self.invalidate_pattern(&CacheKey::metric_pattern(user_id, "muscle_dist"))
            .await;
    }

    /// Drop every cached stat for a user (repair/backfill path)
    pub async fn invalidate_all_for_user(&self, user_id: Uuid) {
        self.invalidate_pattern(&CacheKey::user_pattern(user_id))
            .await;
    }

    // ================================
    // Internals
    // ================================

    async fn windowed_workouts(&self, user_id: Uuid, days: u32) -> AppResult<Vec<Workout>> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        Ok(self
            .store
            .list_user_workouts(user_id)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .filter(|workout| workout.started_at >= cutoff)
            .collect())
    }

    async fn require_user(&self, user_id: Uuid) -> AppResult<User> {
        self.store
            .get_user(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
    }

    async fn read_cache<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> Option<T> {
        match self.cache.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                debug!(key = %key, error = %e, "cache read failed, recomputing");
                None
            }
        }
    }

    async fn write_cache<T: Serialize + Send + Sync>(&self, key: &CacheKey, value: &T) {
        let ttl = self.ttl.ttl_for_metric(&key.metric);
        if let Err(e) = self.cache.set(key, value, ttl).await {
            debug!(key = %key, error = %e, "cache write failed, serving uncached");
        }
    }

    async fn invalidate_pattern(&self, pattern: &str) {
        if let Err(e) = self.cache.invalidate_pattern(pattern).await {
            debug!(pattern = %pattern, error = %e, "cache invalidation failed, entries will expire by TTL");
        }
    }
}

fn bucket_label(index: usize) -> String {
    let bounds = DURATION_BUCKET_UPPER_BOUNDS_MIN;
    if index == 0 {
        return format!("<{}m", bounds[0]);
    }
    if index == bounds.len() {
        return format!(">{}m", bounds[bounds.len() - 1]);
    }
    format!("{}-{}m", bounds[index - 1], bounds[index])
}
