// ABOUTME: Event-driven orchestrator wiring record sync, goals, volume, streaks and cache
// ABOUTME: Explicit dispatch chain with per-user serialization and per-subscriber isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

//! Metrics Engine
//!
//! The single entry point the CRUD layer calls after a successful
//! persistence write. Instead of implicit ORM hooks, each inbound event
//! dispatches to its subscribers in a defined order — for a set save:
//! record sync, then goal update, then volume aggregation, then cache
//! invalidation — and a failure in one subscriber is logged without
//! stopping the ones behind it.
//!
//! All read-recompute-write sequences for one user run behind a per-user
//! async lock, so two concurrent saves can never both read a stale
//! aggregate and write back a non-monotonic result. Cache invalidation
//! runs synchronously before the event returns, keeping the next read
//! from serving stale aggregates.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::achievements::{AchievementEvaluator, AchievementFact};
use crate::cache::{CacheProvider, CacheTtlConfig};
use crate::config::EngineConfig;
use crate::errors::{AppError, AppResult};
use crate::goals::GoalProgressUpdater;
use crate::models::{
    Achievement, BodyMeasurement, Goal, HabitLog, PersonalRecord, Set, User, Workout,
    WorkoutChanges,
};
use crate::notifications::{NotificationDecision, NotificationKind, NotificationSink};
use crate::records::RecordSynchronizer;
use crate::stats::{DistributionSlice, DurationPoint, StatsService, TrendPoint};
use crate::store::EntityStore;
use crate::streaks::StreakTracker;
use crate::volume::VolumeAggregator;

/// Summary returned by the on-demand aggregate repair
#[derive(Debug, Clone, Copy)]
pub struct RepairSummary {
    /// Rebuilt cumulative volume in kg
    pub total_volume_kg: f64,
    /// Rebuilt current streak
    pub current_streak: u32,
    /// Rebuilt longest streak (high-water mark preserved)
    pub longest_streak: u32,
}

/// The derived-metrics recomputation engine
#[derive(Clone)]
pub struct MetricsEngine<S: EntityStore, C: CacheProvider> {
    store: S,
    records: RecordSynchronizer<S>,
    streaks: StreakTracker<S>,
    goals: GoalProgressUpdater<S>,
    volume: VolumeAggregator<S>,
    stats: StatsService<S, C>,
    achievements: AchievementEvaluator<S>,
    sink: Arc<dyn NotificationSink>,
    user_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<S: EntityStore, C: CacheProvider> MetricsEngine<S, C> {
    /// Assemble the engine over a store, a cache, and a notification
    /// sink
    pub fn new(store: S, cache: C, config: &EngineConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            records: RecordSynchronizer::new(store.clone()),
            streaks: StreakTracker::new(store.clone(), config.streak.clone()),
            goals: GoalProgressUpdater::new(store.clone()),
            volume: VolumeAggregator::new(store.clone()),
            stats: StatsService::new(store.clone(), cache, CacheTtlConfig::default()),
            achievements: AchievementEvaluator::new(store.clone()),
            store,
            sink,
            user_locks: Arc::new(DashMap::new()),
        }
    }

    // ================================
    // Inbound events
    // ================================

    /// A set was created or updated. Dispatch order: record sync, goal
    /// update, volume aggregation, cache invalidation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for data-integrity violations (negative
    /// weight reaching the engine) and storage errors from context
    /// resolution. Subscriber failures past that point are logged and
    /// isolated.
    pub async fn on_set_saved(&self, set: &Set) -> AppResult<()> {
        set.validate()?;

        let Some((user_id, workout_id)) = self.resolve_set_owner(set).await? else {
            return Ok(());
        };
        let _guard = self.lock_user(user_id).await;

        // 1. Personal records
        match self.records.sync_set_records(set).await {
            Ok(raised) => {
                if !raised.is_empty() {
                    self.after_records_raised(user_id, &raised).await;
                }
            }
            Err(e) => warn!(set_id = %set.id, error = %e, "record sync failed, continuing"),
        }

        // 2. Goal progress (weight goals)
        match self.goals.on_set_saved(set).await {
            Ok(completed) => self.notify_completed_goals(user_id, &completed).await,
            Err(e) => warn!(set_id = %set.id, error = %e, "goal update failed, continuing"),
        }

        // 3. Volume aggregates, which feed volume goals and milestones
        match self.volume.on_set_event(workout_id, user_id).await {
            Ok(total) => self.after_volume_changed(user_id, total).await,
            Err(e) => warn!(set_id = %set.id, error = %e, "volume aggregation failed, continuing"),
        }

        // 4. Cache invalidation, synchronously before returning
        self.stats.invalidate_for_set_change(user_id).await;

        Ok(())
    }

    /// A set was deleted (already removed from the store). Any record it
    /// held is recomputed from remaining history; volume aggregates and
    /// caches follow.
    ///
    /// # Errors
    ///
    /// Returns storage errors from context resolution; subscriber
    /// failures are logged and isolated.
    pub async fn on_set_deleted(&self, set: &Set) -> AppResult<()> {
        let Some((user_id, workout_id)) = self.resolve_set_owner(set).await? else {
            return Ok(());
        };
        let _guard = self.lock_user(user_id).await;

        if let Err(e) = self.records.handle_set_deleted(set).await {
            warn!(set_id = %set.id, error = %e, "record recompute after deletion failed, continuing");
        }

        match self.volume.on_set_event(workout_id, user_id).await {
            Ok(total) => self.after_volume_changed(user_id, total).await,
            Err(e) => warn!(set_id = %set.id, error = %e, "volume aggregation failed, continuing"),
        }

        self.stats.invalidate_for_set_change(user_id).await;
        Ok(())
    }

    /// A workout was created: streak advance, first-workout and streak
    /// achievements, frequency goals, and a full cache drop for the user
    /// (a new workout shifts every windowed stat).
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the owning user is missing;
    /// subscriber failures are logged and isolated.
    pub async fn on_workout_created(&self, workout: &Workout) -> AppResult<()> {
        let _guard = self.lock_user(workout.user_id).await;

        let workout_count = self
            .store
            .list_user_workouts(workout.user_id)
            .await
            .map_err(AppError::from)?
            .len();
        if workout_count == 1 {
            self.evaluate_and_notify(workout.user_id, AchievementFact::FirstWorkout)
                .await;
        }

        match self.streaks.on_workout_created(workout).await {
            Ok(update) => {
                self.evaluate_and_notify(
                    workout.user_id,
                    AchievementFact::StreakDays(update.current_streak),
                )
                .await;
            }
            Err(e) => {
                warn!(workout_id = %workout.id, error = %e, "streak update failed, continuing");
            }
        }

        match self.goals.on_workout_created(workout).await {
            Ok(completed) => self.notify_completed_goals(workout.user_id, &completed).await,
            Err(e) => {
                warn!(workout_id = %workout.id, error = %e, "frequency goal update failed, continuing");
            }
        }

        self.stats
            .invalidate_for_workout_update(
                workout.user_id,
                WorkoutChanges::STARTED_AT | WorkoutChanges::ENDED_AT,
            )
            .await;
        Ok(())
    }

    /// A workout's fields changed. `changes` names exactly which fields;
    /// the cache mapping is applied selectively, and a `started_at`
    /// change additionally rebuilds the streak from history (the day
    /// sequence may have shifted).
    ///
    /// # Errors
    ///
    /// Returns storage errors from the streak rebuild; cache failures
    /// never surface.
    pub async fn on_workout_updated(
        &self,
        workout: &Workout,
        changes: WorkoutChanges,
    ) -> AppResult<()> {
        if changes.contains(WorkoutChanges::STARTED_AT) {
            let _guard = self.lock_user(workout.user_id).await;
            self.streaks.recompute_user_streak(workout.user_id).await?;
        }

        self.stats
            .invalidate_for_workout_update(workout.user_id, changes)
            .await;
        Ok(())
    }

    /// A body measurement was saved: measurement goals of the same kind
    /// track the reading.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for negative readings and storage errors
    /// from the goal update.
    pub async fn on_body_measurement_saved(&self, measurement: &BodyMeasurement) -> AppResult<()> {
        measurement.validate()?;

        let _guard = self.lock_user(measurement.user_id).await;
        let completed = self.goals.on_measurement_saved(measurement).await?;
        self.notify_completed_goals(measurement.user_id, &completed)
            .await;
        Ok(())
    }

    /// A habit was logged: the habit's streak advances with the same
    /// day-delta semantics as workout streaks.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the streak update.
    pub async fn on_habit_logged(&self, log: &HabitLog) -> AppResult<()> {
        let _guard = self.lock_user(log.user_id).await;
        self.streaks.on_habit_logged(log).await
    }

    // ================================
    // Outbound queries
    // ================================

    /// Per-workout volume series over the last `days` days
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and storage
    /// errors from the history read.
    pub async fn volume_trend(&self, user_id: Uuid, days: u32) -> AppResult<Vec<TrendPoint>> {
        self.stats.volume_trend(user_id, days).await
    }

    /// Volume share per muscle group over the last `days` days
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and storage
    /// errors from history reads.
    pub async fn muscle_distribution(
        &self,
        user_id: Uuid,
        days: u32,
    ) -> AppResult<Vec<DistributionSlice>> {
        self.stats.muscle_distribution(user_id, days).await
    }

    /// Histogram of finished-workout durations over the last `days` days
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and storage
    /// errors from the history read.
    pub async fn duration_distribution(
        &self,
        user_id: Uuid,
        days: u32,
    ) -> AppResult<Vec<DistributionSlice>> {
        self.stats.duration_distribution(user_id, days).await
    }

    /// The `limit` most recent finished workouts' durations
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and storage
    /// errors from the history read.
    pub async fn duration_history(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<DurationPoint>> {
        self.stats.duration_history(user_id, limit).await
    }

    /// Display-time streak: 0 once the streak has lapsed, regardless of
    /// the persisted counter
    #[must_use]
    pub fn effective_streak(&self, user: &User) -> u32 {
        self.streaks.effective_streak(user, Utc::now())
    }

    // ================================
    // Repair
    // ================================

    /// Rebuild every derived aggregate for a user from raw history:
    /// workout volumes, the cumulative total, streak fields, volume-goal
    /// progress, and a full cache drop. Converges — a second call with
    /// unchanged raw data is a no-op.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the rebuild reads/writes.
    pub async fn recompute_user_aggregates(&self, user_id: Uuid) -> AppResult<RepairSummary> {
        let _guard = self.lock_user(user_id).await;

        let total_volume_kg = self.volume.recompute_all_for_user(user_id).await?;
        let streak = self.streaks.recompute_user_streak(user_id).await?;

        let completed = self
            .goals
            .on_user_volume_changed(user_id, total_volume_kg, Utc::now())
            .await?;
        self.notify_completed_goals(user_id, &completed).await;

        self.stats.invalidate_all_for_user(user_id).await;

        debug!(user_id = %user_id, total_volume_kg, "user aggregates rebuilt");
        Ok(RepairSummary {
            total_volume_kg,
            current_streak: streak.current_streak,
            longest_streak: streak.longest_streak,
        })
    }

    // ================================
    // Internals
    // ================================

    /// Serialize read-recompute-write sequences per user. The guard is
    /// held across every aggregate write of one event.
    async fn lock_user(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    async fn resolve_set_owner(&self, set: &Set) -> AppResult<Option<(Uuid, Uuid)>> {
        let Some(line) = self
            .store
            .get_workout_line(set.workout_line_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(set_id = %set.id, "workout line missing, event dropped");
            return Ok(None);
        };
        let Some(workout) = self
            .store
            .get_workout(line.workout_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(set_id = %set.id, workout_id = %line.workout_id, "workout missing, event dropped");
            return Ok(None);
        };
        Ok(Some((workout.user_id, workout.id)))
    }

    async fn after_records_raised(&self, user_id: Uuid, raised: &[PersonalRecord]) {
        self.evaluate_and_notify(user_id, AchievementFact::PersonalRecord)
            .await;

        let Some(user) = self.user_for_notification(user_id).await else {
            return;
        };
        if !user.notification_preferences.personal_record {
            return;
        }
        for record in raised {
            self.dispatch(NotificationDecision {
                user_id,
                kind: NotificationKind::PersonalRecord,
                message: format!("New {} record: {:.2}", record.kind, record.value),
                payload: serde_json::json!({
                    "exercise_id": record.exercise_id,
                    "record_kind": record.kind.as_str(),
                    "value": record.value,
                }),
                decided_at: Utc::now(),
            })
            .await;
        }
    }

    async fn after_volume_changed(&self, user_id: Uuid, total_volume_kg: f64) {
        match self
            .goals
            .on_user_volume_changed(user_id, total_volume_kg, Utc::now())
            .await
        {
            Ok(completed) => self.notify_completed_goals(user_id, &completed).await,
            Err(e) => warn!(user_id = %user_id, error = %e, "volume goal update failed, continuing"),
        }

        self.evaluate_and_notify(user_id, AchievementFact::TotalVolume(total_volume_kg))
            .await;
    }

    async fn evaluate_and_notify(&self, user_id: Uuid, fact: AchievementFact) {
        let unlocked = match self.achievements.evaluate(user_id, fact, Utc::now()).await {
            Ok(unlocked) => unlocked,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "achievement evaluation failed, continuing");
                return;
            }
        };
        if unlocked.is_empty() {
            return;
        }

        let Some(user) = self.user_for_notification(user_id).await else {
            return;
        };
        if !user.notification_preferences.achievement {
            return;
        }
        for achievement in &unlocked {
            self.dispatch(achievement_decision(user_id, achievement)).await;
        }
    }

    async fn notify_completed_goals(&self, user_id: Uuid, completed: &[Goal]) {
        if completed.is_empty() {
            return;
        }
        let Some(user) = self.user_for_notification(user_id).await else {
            return;
        };
        if !user.notification_preferences.goal_completed {
            return;
        }
        for goal in completed {
            self.dispatch(NotificationDecision {
                user_id,
                kind: NotificationKind::GoalCompleted,
                message: format!("Goal reached: {} target {:.1}", goal.kind, goal.target_value),
                payload: serde_json::json!({
                    "goal_id": goal.id,
                    "goal_kind": goal.kind.as_str(),
                    "target_value": goal.target_value,
                }),
                decided_at: Utc::now(),
            })
            .await;
        }
    }

    async fn user_for_notification(&self, user_id: Uuid) -> Option<User> {
        match self.store.get_user(user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "user lookup for notification failed");
                None
            }
        }
    }

    async fn dispatch(&self, decision: NotificationDecision) {
        if let Err(e) = self.sink.dispatch(decision).await {
            warn!(error = %e, "notification dispatch failed, decision dropped");
        }
    }
}

fn achievement_decision(user_id: Uuid, achievement: &Achievement) -> NotificationDecision {
    NotificationDecision {
        user_id,
        kind: NotificationKind::AchievementUnlocked,
        message: format!("Achievement unlocked: {}", achievement.name),
        payload: serde_json::json!({
            "achievement_id": achievement.id,
            "slug": achievement.slug,
        }),
        decided_at: Utc::now(),
    }
}
