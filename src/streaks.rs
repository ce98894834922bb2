// ABOUTME: Consecutive-day streak tracking for workouts and habits
// ABOUTME: Incremental day-delta machine with full recompute for backdated entries
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! Streak Tracker
//!
//! Per-user state machine over two persisted fields (`current_streak`,
//! `last_workout_at`), compared on local calendar days. A second workout
//! on the same day never double-increments; `longest_streak` is a
//! high-water mark and never decremented; a backdated workout triggers a
//! full recompute from the sorted day sequence instead of corrupting the
//! incremental state.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::StreakConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{HabitLog, User, Workout};
use crate::store::EntityStore;

/// Result of applying a workout event to a user's streak
#[derive(Debug, Clone, Copy)]
pub struct StreakUpdate {
    /// Streak after the event
    pub current_streak: u32,
    /// Longest streak after the event
    pub longest_streak: u32,
    /// Whether this event extended the streak (new day counted)
    pub extended: bool,
}

/// Incremental day-delta transition shared by workout and habit streaks.
/// Delta 0 (same day) and negative deltas leave the streak unchanged.
const fn advance_streak(current: u32, day_delta: i64) -> u32 {
    match day_delta {
        1 => current + 1,
        d if d > 1 => 1,
        _ => current,
    }
}

/// Current-run length and longest run over a sorted, deduplicated
/// sequence of active days
fn runs_over_days(days: &[NaiveDate]) -> (u32, u32) {
    let mut longest: u32 = 0;
    let mut run: u32 = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous {
            Some(prev) if (day - prev).num_days() == 1 => run + 1,
            Some(_) | None => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    (run, longest)
}

/// Tracks workout and habit streaks against the entity store
#[derive(Clone)]
pub struct StreakTracker<S: EntityStore> {
    store: S,
    config: StreakConfig,
}

impl<S: EntityStore> StreakTracker<S> {
    /// Create a tracker with the given streak configuration
    pub const fn new(store: S, config: StreakConfig) -> Self {
        Self { store, config }
    }

    /// Apply a workout-creation event to the owning user's streak.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the owning user is missing and a
    /// storage error when reads or writes fail.
    pub async fn on_workout_created(&self, workout: &Workout) -> AppResult<StreakUpdate> {
        let user = self.require_user(workout.user_id).await?;

        let event_day = user.local_date(workout.started_at);

        let (current, extended) = match user.last_workout_at {
            None => (1, true),
            Some(last) => {
                let delta = (event_day - user.local_date(last)).num_days();
                if delta < 0 {
                    // Backdated entry: the incremental machine cannot
                    // know whether the earlier day joins two runs, so
                    // rebuild from the full day sequence.
                    debug!(user_id = %user.id, "backdated workout, recomputing streak from history");
                    return self.recompute_user_streak(workout.user_id).await;
                }
                let next = advance_streak(user.current_streak, delta);
                (next, delta >= 1)
            }
        };

        let longest = user.longest_streak.max(current);
        let last_workout_at = match user.last_workout_at {
            Some(last) => Some(last.max(workout.started_at)),
            None => Some(workout.started_at),
        };

        self.store
            .update_user_streak(user.id, current, longest, last_workout_at)
            .await
            .map_err(AppError::from)?;

        Ok(StreakUpdate {
            current_streak: current,
            longest_streak: longest,
            extended,
        })
    }

    /// Rebuild the streak fields from the full workout history. Used for
    /// backdated entries and for on-demand repair/backfill.
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user is missing and a storage
    /// error when reads or writes fail.
    pub async fn recompute_user_streak(&self, user_id: Uuid) -> AppResult<StreakUpdate> {
        let user = self.require_user(user_id).await?;

        let workouts = self
            .store
            .list_user_workouts(user_id)
            .await
            .map_err(AppError::from)?;

        let mut days: Vec<NaiveDate> = workouts
            .iter()
            .map(|w| user.local_date(w.started_at))
            .collect();
        days.sort_unstable();
        days.dedup();

        let (current, longest_from_history) = runs_over_days(&days);
        // The persisted longest streak is a high-water mark; history may
        // have shrunk (deleted workouts) but the mark never does.
        let longest = user.longest_streak.max(longest_from_history);
        let last_workout_at = workouts.iter().map(|w| w.started_at).max();

        self.store
            .update_user_streak(user_id, current, longest, last_workout_at)
            .await
            .map_err(AppError::from)?;

        Ok(StreakUpdate {
            current_streak: current,
            longest_streak: longest,
            extended: false,
        })
    }

    /// Display-time streak: the persisted counter is not authoritative
    /// for "is the streak alive today". Reports 0 once more than the
    /// configured grace period of full calendar days has elapsed since
    /// the last workout.
    #[must_use]
    pub fn effective_streak(&self, user: &User, now: DateTime<Utc>) -> u32 {
        user.last_workout_at.map_or(0, |last| {
            let elapsed = (user.local_date(now) - user.local_date(last)).num_days();
            if elapsed > self.config.effective_grace_days {
                0
            } else {
                user.current_streak
            }
        })
    }

    /// Apply a habit-log event to the habit's streak fields, with the
    /// same day-delta semantics as workout streaks. Backdated logs leave
    /// the streak untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error when reads or writes fail.
    pub async fn on_habit_logged(&self, log: &HabitLog) -> AppResult<()> {
        let Some(habit) = self
            .store
            .get_habit(log.habit_id)
            .await
            .map_err(AppError::from)?
        else {
            warn!(habit_id = %log.habit_id, "habit missing, skipping streak update");
            return Ok(());
        };

        let user = self.require_user(log.user_id).await?;
        let event_day = user.local_date(log.logged_at);

        let current = match habit.last_logged_at {
            None => 1,
            Some(last) => {
                let delta = (event_day - user.local_date(last)).num_days();
                if delta < 0 {
                    debug!(habit_id = %habit.id, "backdated habit log ignored for streak");
                    return Ok(());
                }
                advance_streak(habit.current_streak, delta)
            }
        };

        let longest = habit.longest_streak.max(current);
        let last_logged_at = match habit.last_logged_at {
            Some(last) => Some(last.max(log.logged_at)),
            None => Some(log.logged_at),
        };

        self.store
            .update_habit_streak(habit.id, current, longest, last_logged_at)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn require_user(&self, user_id: Uuid) -> AppResult<User> {
        self.store
            .get_user(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_advance_streak_transitions() {
        assert_eq!(advance_streak(3, 0), 3); // same day
        assert_eq!(advance_streak(3, 1), 4); // next day
        assert_eq!(advance_streak(3, 2), 1); // gap resets
        assert_eq!(advance_streak(3, -1), 3); // backdated leaves unchanged
    }

    #[test]
    fn test_runs_over_days_tracks_current_and_longest() {
        let days = vec![
            d(2025, 1, 1),
            d(2025, 1, 2),
            d(2025, 1, 3),
            d(2025, 1, 10),
            d(2025, 1, 11),
        ];
        let (current, longest) = runs_over_days(&days);
        assert_eq!(current, 2);
        assert_eq!(longest, 3);
    }

    #[test]
    fn test_runs_over_empty_history() {
        assert_eq!(runs_over_days(&[]), (0, 0));
    }
}
