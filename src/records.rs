// ABOUTME: Personal record synchronizer reacting to set mutations
// ABOUTME: Records only ever rise, except recompute-from-history after deletion or downgrade
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

//! Personal Record Synchronizer
//!
//! Keeps the per-(user, exercise, kind) record rows consistent with set
//! history. The stored value is monotonically non-decreasing for the life
//! of a set; only deleting or lowering the record-holding set triggers a
//! full rescan of remaining eligible history. Failures are isolated per
//! record kind: one kind failing never blocks the others.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::formulas::estimated_one_rep_max;
use crate::models::{PersonalRecord, RecordKind, Set, Workout, WorkoutLine};
use crate::store::{EntityStore, SetContext};

/// Candidate value a set offers for one record kind
#[derive(Debug, Clone, Copy)]
struct Candidate {
    value: f64,
    secondary_value: Option<f64>,
}

fn candidate_for(set: &Set, kind: RecordKind) -> Option<Candidate> {
    match kind {
        RecordKind::MaxWeight => set.weight_kg.map(|weight| Candidate {
            value: weight,
            secondary_value: set.reps.map(f64::from),
        }),
        RecordKind::MaxOneRepMax => match (set.weight_kg, set.reps) {
            (Some(weight), Some(reps)) => {
                estimated_one_rep_max(weight, reps).map(|one_rm| Candidate {
                    value: one_rm,
                    secondary_value: Some(weight),
                })
            }
            _ => None,
        },
        RecordKind::MaxVolumeSet => match (set.weight_kg, set.reps) {
            (Some(weight), Some(reps)) => Some(Candidate {
                value: weight * f64::from(reps),
                secondary_value: Some(weight),
            }),
            _ => None,
        },
    }
}

/// Synchronizes personal records against set mutations
#[derive(Clone)]
pub struct RecordSynchronizer<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> RecordSynchronizer<S> {
    /// Create a synchronizer over the given store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// React to a set being created or updated (non-deleted state).
    ///
    /// Returns the records that were created or raised by this call, for
    /// achievement evaluation and notification decisions downstream.
    ///
    /// # Errors
    ///
    /// Returns an error only when resolving the set's owning line/workout
    /// fails at the store level; per-kind evaluation failures are logged
    /// and skipped.
    pub async fn sync_set_records(&self, set: &Set) -> AppResult<Vec<PersonalRecord>> {
        if !set.is_record_eligible() {
            debug!(set_id = %set.id, "set not record-eligible (warmup or incomplete)");
            return Ok(Vec::new());
        }

        let Some((line, workout)) = self.resolve_context(set).await? else {
            return Ok(Vec::new());
        };

        if self
            .store
            .get_exercise(line.exercise_id)
            .await
            .map_err(AppError::from)?
            .is_none()
        {
            warn!(
                exercise_id = %line.exercise_id,
                set_id = %set.id,
                "exercise missing, skipping record sync"
            );
            return Ok(Vec::new());
        }

        let mut raised = Vec::new();
        for kind in RecordKind::ALL {
            // Isolated per-kind failure: a bad evaluation for one record
            // kind must not block the remaining kinds.
            match self.sync_one_kind(set, &line, &workout, kind).await {
                Ok(Some(record)) => raised.push(record),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        set_id = %set.id,
                        kind = %kind,
                        error = %e,
                        "record sync failed for kind, continuing with siblings"
                    );
                }
            }
        }
        Ok(raised)
    }

    /// React to a set being deleted. The set has already been removed
    /// from the store; any record it held is recomputed over remaining
    /// eligible history.
    ///
    /// # Errors
    ///
    /// Returns an error when resolving the owning line/workout fails.
    pub async fn handle_set_deleted(&self, set: &Set) -> AppResult<()> {
        let Some((line, workout)) = self.resolve_context(set).await? else {
            return Ok(());
        };

        for kind in RecordKind::ALL {
            let existing = self
                .store
                .get_personal_record(workout.user_id, line.exercise_id, kind)
                .await
                .map_err(AppError::from)?;

            if existing.is_some_and(|record| record.set_id == Some(set.id)) {
                if let Err(e) = self
                    .recompute_record(workout.user_id, line.exercise_id, kind)
                    .await
                {
                    warn!(
                        set_id = %set.id,
                        kind = %kind,
                        error = %e,
                        "record recompute after deletion failed"
                    );
                }
            }
        }
        Ok(())
    }

    /// Rebuild one (user, exercise, kind) record from remaining eligible
    /// sets, deleting the row when no eligible set remains.
    ///
    /// # Errors
    ///
    /// Returns an error when the history scan or the write fails.
    pub async fn recompute_record(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        kind: RecordKind,
    ) -> AppResult<()> {
        let rows = self
            .store
            .list_exercise_sets(user_id, exercise_id)
            .await
            .map_err(AppError::from)?;

        let best = best_candidate(&rows, kind);

        match best {
            Some((row, candidate)) => {
                let existing_id = self
                    .store
                    .get_personal_record(user_id, exercise_id, kind)
                    .await
                    .map_err(AppError::from)?
                    .map(|r| r.id);

                let record = PersonalRecord {
                    id: existing_id.unwrap_or_else(Uuid::new_v4),
                    user_id,
                    exercise_id,
                    kind,
                    value: candidate.value,
                    secondary_value: candidate.secondary_value,
                    achieved_at: row.workout_started_at,
                    workout_id: Some(row.workout_id),
                    set_id: Some(row.set.id),
                };
                self.store
                    .upsert_personal_record(&record)
                    .await
                    .map_err(AppError::from)?;
                debug!(
                    user_id = %user_id,
                    exercise_id = %exercise_id,
                    kind = %kind,
                    value = candidate.value,
                    "record recomputed from history"
                );
            }
            None => {
                self.store
                    .delete_personal_record(user_id, exercise_id, kind)
                    .await
                    .map_err(AppError::from)?;
                debug!(
                    user_id = %user_id,
                    exercise_id = %exercise_id,
                    kind = %kind,
                    "no eligible sets remain, record deleted"
                );
            }
        }
        Ok(())
    }

    async fn resolve_context(&self, set: &Set) -> AppResult<Option<(WorkoutLine, Workout)>> {
        let Some(line) = self
            .store
            .get_workout_line(set.workout_line_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(set_id = %set.id, "workout line missing, skipping record sync");
            return Ok(None);
        };

        let Some(workout) = self
            .store
            .get_workout(line.workout_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(set_id = %set.id, workout_id = %line.workout_id, "workout missing, skipping record sync");
            return Ok(None);
        };

        Ok(Some((line, workout)))
    }

    async fn sync_one_kind(
        &self,
        set: &Set,
        line: &WorkoutLine,
        workout: &Workout,
        kind: RecordKind,
    ) -> AppResult<Option<PersonalRecord>> {
        let candidate = candidate_for(set, kind);
        let existing = self
            .store
            .get_personal_record(workout.user_id, line.exercise_id, kind)
            .await
            .map_err(AppError::from)?;

        match (candidate, existing) {
            (Some(candidate), existing) => {
                let current_value = existing.as_ref().map(|r| r.value);
                if current_value.is_none_or(|value| candidate.value > value) {
                    let record = PersonalRecord {
                        id: existing.map_or_else(Uuid::new_v4, |r| r.id),
                        user_id: workout.user_id,
                        exercise_id: line.exercise_id,
                        kind,
                        value: candidate.value,
                        secondary_value: candidate.secondary_value,
                        achieved_at: workout.started_at,
                        workout_id: Some(workout.id),
                        set_id: Some(set.id),
                    };
                    self.store
                        .upsert_personal_record(&record)
                        .await
                        .map_err(AppError::from)?;
                    return Ok(Some(record));
                }

                // Downward edit of the record-holding set: the stored
                // value can no longer be trusted, rebuild from history.
                if existing.is_some_and(|r| r.set_id == Some(set.id) && candidate.value < r.value)
                {
                    self.recompute_record(workout.user_id, line.exercise_id, kind)
                        .await?;
                }
                Ok(None)
            }
            (None, Some(existing)) if existing.set_id == Some(set.id) => {
                // The record-holding set lost the fields that produced
                // the candidate (e.g. reps edited to zero).
                self.recompute_record(workout.user_id, line.exercise_id, kind)
                    .await?;
                Ok(None)
            }
            (None, _) => Ok(None),
        }
    }
}

fn best_candidate(rows: &[SetContext], kind: RecordKind) -> Option<(&SetContext, Candidate)> {
    let mut best: Option<(&SetContext, Candidate)> = None;
    for row in rows {
        if !row.set.is_record_eligible() {
            continue;
        }
        let Some(candidate) = candidate_for(&row.set, kind) else {
            continue;
        };
        // Strict comparison keeps the earliest achiever on ties
        if best.is_none_or(|(_, current)| candidate.value > current.value) {
            best = Some((row, candidate));
        }
    }
    best
}
