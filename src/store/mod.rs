// ABOUTME: Entity store abstraction for the derived-metrics engine
// ABOUTME: Trait-based boundary over durable records with an in-memory reference backend
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! The engine's only view of persistence. The real storage layer (SQL,
//! transactions, migrations) is an external collaborator; implementations
//! of [`EntityStore`] adapt it to the reads and aggregate writes the
//! engine needs. [`memory::InMemoryStore`] is the reference backend used
//! by tests and embedded deployments.

/// In-memory store implementation
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Achievement, Exercise, Goal, Habit, PersonalRecord, RecordKind, Set, User, UserAchievement,
    Workout, WorkoutLine,
};

/// A set joined with its owning workout, as needed for record
/// recomputation over exercise history
#[derive(Debug, Clone)]
pub struct SetContext {
    /// The set itself
    pub set: Set,
    /// Owning workout
    pub workout_id: Uuid,
    /// Owning workout's start timestamp (used as `achieved_at`)
    pub workout_started_at: DateTime<Utc>,
}

/// Core entity store abstraction.
///
/// All backends must implement this trait to give the engine a consistent
/// interface over durable records. Reads are point lookups and per-user
/// scans; writes are restricted to the aggregate fields the engine owns.
#[async_trait]
pub trait EntityStore: Send + Sync + Clone {
    // ================================
    // Users
    // ================================

    /// Get user by ID
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Write engine-owned streak fields
    async fn update_user_streak(
        &self,
        user_id: Uuid,
        current_streak: u32,
        longest_streak: u32,
        last_workout_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Write the engine-owned cumulative volume
    async fn update_user_total_volume(&self, user_id: Uuid, total_volume_kg: f64) -> Result<()>;

    // ================================
    // Exercises
    // ================================

    /// Get exercise by ID
    async fn get_exercise(&self, exercise_id: Uuid) -> Result<Option<Exercise>>;

    // ================================
    // Workouts, lines, sets
    // ================================

    /// Get workout by ID
    async fn get_workout(&self, workout_id: Uuid) -> Result<Option<Workout>>;

    /// All workouts for a user, ordered by `started_at` ascending
    async fn list_user_workouts(&self, user_id: Uuid) -> Result<Vec<Workout>>;

    /// Write the engine-owned denormalized workout volume
    async fn update_workout_volume(&self, workout_id: Uuid, volume_kg: f64) -> Result<()>;

    /// Get workout line by ID
    async fn get_workout_line(&self, line_id: Uuid) -> Result<Option<WorkoutLine>>;

    /// All lines of a workout, ordered by position
    async fn list_workout_lines(&self, workout_id: Uuid) -> Result<Vec<WorkoutLine>>;

    /// All sets across all lines of a workout
    async fn list_workout_sets(&self, workout_id: Uuid) -> Result<Vec<Set>>;

    /// All sets a user has logged for one exercise, joined with their
    /// owning workouts, ordered by set creation ascending
    async fn list_exercise_sets(&self, user_id: Uuid, exercise_id: Uuid)
        -> Result<Vec<SetContext>>;

    // ================================
    // Personal records
    // ================================

    /// Get the record row for one (user, exercise, kind) tuple
    async fn get_personal_record(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        kind: RecordKind,
    ) -> Result<Option<PersonalRecord>>;

    /// Insert or replace the record row for its (user, exercise, kind)
    async fn upsert_personal_record(&self, record: &PersonalRecord) -> Result<()>;

    /// Delete the record row for one (user, exercise, kind) tuple
    async fn delete_personal_record(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        kind: RecordKind,
    ) -> Result<()>;

    /// All records for a user
    async fn list_personal_records(&self, user_id: Uuid) -> Result<Vec<PersonalRecord>>;

    // ================================
    // Goals
    // ================================

    /// All goals for a user (completed ones included; the updater skips
    /// what no longer matches)
    async fn list_user_goals(&self, user_id: Uuid) -> Result<Vec<Goal>>;

    /// Write engine-owned goal progress fields
    async fn update_goal(&self, goal: &Goal) -> Result<()>;

    // ================================
    // Habits
    // ================================

    /// Get habit by ID
    async fn get_habit(&self, habit_id: Uuid) -> Result<Option<Habit>>;

    /// Write engine-owned habit streak fields
    async fn update_habit_streak(
        &self,
        habit_id: Uuid,
        current_streak: u32,
        longest_streak: u32,
        last_logged_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    // ================================
    // Achievements
    // ================================

    /// The achievement catalog
    async fn list_achievements(&self) -> Result<Vec<Achievement>>;

    /// Insert the (user, achievement) unlock row if absent.
    /// Returns `true` only on first insertion — the uniqueness constraint
    /// makes repeat unlocks a no-op, never an error.
    async fn try_unlock_achievement(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
        achieved_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// All unlocks for a user
    async fn list_user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>>;
}
