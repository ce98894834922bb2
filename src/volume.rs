// ABOUTME: Denormalized volume aggregation for workouts and users
// ABOUTME: Full recompute from set history on every mutation, no incremental drift
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! Volume Aggregator
//!
//! `Workout.volume_kg` and `User.total_volume_kg` are derived fields owned
//! by the engine. Every set mutation recomputes the owning workout's
//! volume as the sum over all its sets, then the user total as the sum
//! over all workouts. Recomputing from raw history (rather than applying
//! deltas) keeps concurrent edits to sibling sets from double-counting.

use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::store::EntityStore;

/// Aggregates volume totals against the entity store
#[derive(Clone)]
pub struct VolumeAggregator<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> VolumeAggregator<S> {
    /// Create an aggregator over the given store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Recompute one workout's volume from its sets and the owning
    /// user's total from all workouts. Returns the new user total.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn on_set_event(&self, workout_id: Uuid, user_id: Uuid) -> AppResult<f64> {
        let workout_volume = self.recompute_workout_volume(workout_id).await?;
        debug!(workout_id = %workout_id, volume_kg = workout_volume, "workout volume recomputed");
        self.recompute_user_volume(user_id).await
    }

    /// Recompute one workout's denormalized volume from its sets
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn recompute_workout_volume(&self, workout_id: Uuid) -> AppResult<f64> {
        let sets = self
            .store
            .list_workout_sets(workout_id)
            .await
            .map_err(AppError::from)?;
        let volume: f64 = sets.iter().map(crate::models::Set::volume_kg).sum();

        self.store
            .update_workout_volume(workout_id, volume)
            .await
            .map_err(AppError::from)?;
        Ok(volume)
    }

    /// Recompute the user's cumulative volume as the sum over all of
    /// their workouts' stored volumes
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn recompute_user_volume(&self, user_id: Uuid) -> AppResult<f64> {
        let workouts = self
            .store
            .list_user_workouts(user_id)
            .await
            .map_err(AppError::from)?;
        let total: f64 = workouts.iter().map(|w| w.volume_kg).sum();

        self.store
            .update_user_total_volume(user_id, total)
            .await
            .map_err(AppError::from)?;
        Ok(total)
    }

    /// Repair/backfill entry point: rebuild every workout volume from
    /// sets, then the user total. Returns the new user total.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn recompute_all_for_user(&self, user_id: Uuid) -> AppResult<f64> {
        let workouts = self
            .store
            .list_user_workouts(user_id)
            .await
            .map_err(AppError::from)?;
        for workout in &workouts {
            self.recompute_workout_volume(workout.id).await?;
        }
        self.recompute_user_volume(user_id).await
    }
}
