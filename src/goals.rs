// ABOUTME: Goal progress updater reacting to set, measurement, workout and volume events
// ABOUTME: Direction-aware clamped progress; completion fires exactly once per goal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

//! Goal Progress Updater
//!
//! Matches mutations against the goals they affect: weight goals by
//! exercise, measurement goals by measurement kind, frequency goals by
//! workout count, volume goals by cumulative volume. Weight goals mirror
//! record semantics (achieved max, warmups excluded); measurement goals
//! track the latest reading and may move in either direction.
//! `completed_at` is set on the first direction-aware target crossing and
//! never cleared here.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{BodyMeasurement, Goal, GoalKind, Set, Workout};
use crate::store::EntityStore;

/// Normalized progress between start and target, clamped to [0, 100].
///
/// The signed ratio `(current - start) / (target - start)` is
/// direction-aware: movement away from the target clamps to 0. When
/// start and target coincide the ratio is undefined; the goal is either
/// met (100) or not (0).
#[must_use]
pub fn progress_percent(start_value: f64, target_value: f64, current_value: f64) -> f64 {
    let gap = target_value - start_value;
    if gap.abs() < f64::EPSILON {
        if meets_target(start_value, target_value, current_value) {
            return 100.0;
        }
        return 0.0;
    }
    ((current_value - start_value) / gap * 100.0).clamp(0.0, 100.0)
}

/// Direction-aware completion condition
#[must_use]
pub fn meets_target(start_value: f64, target_value: f64, current_value: f64) -> bool {
    if target_value >= start_value {
        current_value >= target_value
    } else {
        current_value <= target_value
    }
}

/// Updates goal progress against the entity store
#[derive(Clone)]
pub struct GoalProgressUpdater<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> GoalProgressUpdater<S> {
    /// Create an updater over the given store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// React to a set save: weight goals on the same exercise track the
    /// achieved max weight (record semantics, warmups excluded).
    ///
    /// Returns goals newly completed by this event.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn on_set_saved(&self, set: &Set) -> AppResult<Vec<Goal>> {
        if !set.is_record_eligible() {
            return Ok(Vec::new());
        }
        let Some(weight) = set.weight_kg else {
            return Ok(Vec::new());
        };

        let Some(line) = self
            .store
            .get_workout_line(set.workout_line_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(set_id = %set.id, "workout line missing, skipping goal update");
            return Ok(Vec::new());
        };
        let Some(workout) = self
            .store
            .get_workout(line.workout_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(set_id = %set.id, "workout missing, skipping goal update");
            return Ok(Vec::new());
        };

        let mut completed = Vec::new();
        for goal in self
            .matching_goals(workout.user_id, GoalKind::Weight)
            .await?
        {
            if goal.exercise_id != Some(line.exercise_id) {
                continue;
            }
            // Achieved max for the exercise: a lighter set never lowers it
            let observed = goal.current_value.max(weight);
            if let Some(goal) = self.apply_observation(goal, observed, set.created_at).await? {
                completed.push(goal);
            }
        }
        Ok(completed)
    }

    /// React to a body-measurement save: measurement goals of the same
    /// kind track the latest reading — which may move either way.
    ///
    /// Returns goals newly completed by this event.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn on_measurement_saved(
        &self,
        measurement: &BodyMeasurement,
    ) -> AppResult<Vec<Goal>> {
        let mut completed = Vec::new();
        for goal in self
            .matching_goals(measurement.user_id, GoalKind::Measurement)
            .await?
        {
            if goal.measurement_kind != Some(measurement.kind) {
                continue;
            }
            if let Some(goal) = self
                .apply_observation(goal, measurement.value, measurement.recorded_at)
                .await?
            {
                completed.push(goal);
            }
        }
        Ok(completed)
    }

    /// React to a workout creation: frequency goals count workouts
    /// logged since the goal was created.
    ///
    /// Returns goals newly completed by this event.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn on_workout_created(&self, workout: &Workout) -> AppResult<Vec<Goal>> {
        let goals = self
            .matching_goals(workout.user_id, GoalKind::Frequency)
            .await?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }

        let workouts = self
            .store
            .list_user_workouts(workout.user_id)
            .await
            .map_err(AppError::from)?;

        let mut completed = Vec::new();
        for goal in goals {
            let count = workouts
                .iter()
                .filter(|w| w.started_at >= goal.created_at)
                .count() as f64;
            if let Some(goal) = self
                .apply_observation(goal, count, workout.started_at)
                .await?
            {
                completed.push(goal);
            }
        }
        Ok(completed)
    }

    /// React to the user's cumulative volume changing: volume goals
    /// track the running total (their `start_value` anchors the
    /// baseline at creation time).
    ///
    /// Returns goals newly completed by this event.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn on_user_volume_changed(
        &self,
        user_id: Uuid,
        total_volume_kg: f64,
        observed_at: DateTime<Utc>,
    ) -> AppResult<Vec<Goal>> {
        let mut completed = Vec::new();
        for goal in self.matching_goals(user_id, GoalKind::Volume).await? {
            if let Some(goal) = self
                .apply_observation(goal, total_volume_kg, observed_at)
                .await?
            {
                completed.push(goal);
            }
        }
        Ok(completed)
    }

    async fn matching_goals(&self, user_id: Uuid, kind: GoalKind) -> AppResult<Vec<Goal>> {
        Ok(self
            .store
            .list_user_goals(user_id)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .filter(|goal| goal.kind == kind)
            .collect())
    }

    /// Write the observation into the goal, setting `completed_at`
    /// exactly once on the first direction-aware crossing. Returns the
    /// goal when this call completed it.
    async fn apply_observation(
        &self,
        mut goal: Goal,
        observed: f64,
        observed_at: DateTime<Utc>,
    ) -> AppResult<Option<Goal>> {
        goal.current_value = observed;
        goal.progress_percent =
            progress_percent(goal.start_value, goal.target_value, observed);

        let newly_completed = goal.completed_at.is_none()
            && meets_target(goal.start_value, goal.target_value, observed);
        if newly_completed {
            goal.completed_at = Some(observed_at);
            debug!(goal_id = %goal.id, kind = %goal.kind, "goal completed");
        }

        self.store
            .update_goal(&goal)
            .await
            .map_err(AppError::from)?;

        Ok(newly_completed.then_some(goal))
    }
}
