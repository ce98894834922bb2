// ABOUTME: Core data models for the Ironlog derived-metrics engine
// ABOUTME: Defines Set, Workout, Goal, PersonalRecord, Achievement and related enums
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

//! Domain records the engine reads and derives from. Raw records (sets,
//! workouts, measurements, habit logs) are mutated by the excluded CRUD
//! layer; aggregate fields (`User.current_streak`, `User.total_volume`,
//! `Workout.volume_kg`, goal progress, personal records) are owned
//! exclusively by the engine.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use bitflags::bitflags;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Biological gender used by gender-parameterized formulas (BMR, Wilks)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male coefficients
    Male,
    /// Female coefficients
    Female,
}

/// Activity level for TDEE calculation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Training 1-3 days/week
    LightlyActive,
    /// Training 3-5 days/week
    ModeratelyActive,
    /// Training 6-7 days/week
    VeryActive,
    /// Hard training twice a day
    ExtraActive,
}

/// Training goal driving the calorie adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrainingGoal {
    /// Caloric deficit (-20%)
    Cut,
    /// Caloric balance
    Maintain,
    /// Caloric surplus (+10%)
    Bulk,
}

/// Personal record categories tracked per (user, exercise)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Heaviest weight lifted for any rep count
    MaxWeight,
    /// Highest estimated one-rep max (Epley)
    MaxOneRepMax,
    /// Highest single-set volume (weight x reps)
    MaxVolumeSet,
}

impl RecordKind {
    /// All record kinds, in candidate-evaluation order
    pub const ALL: [Self; 3] = [Self::MaxWeight, Self::MaxOneRepMax, Self::MaxVolumeSet];

    /// Stable string form for storage and cache keys
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MaxWeight => "max_weight",
            Self::MaxOneRepMax => "max_1rm",
            Self::MaxVolumeSet => "max_volume_set",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max_weight" => Ok(Self::MaxWeight),
            "max_1rm" => Ok(Self::MaxOneRepMax),
            "max_volume_set" => Ok(Self::MaxVolumeSet),
            _ => Err(AppError::invalid_input(format!(
                "Invalid record kind: {s}"
            ))),
        }
    }
}

/// Goal categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    /// Reach a target weight on a specific exercise (tracks achieved max)
    Weight,
    /// Log a target number of workouts
    Frequency,
    /// Accumulate a target total training volume
    Volume,
    /// Move a body measurement to a target value (tracks latest reading)
    Measurement,
}

impl GoalKind {
    /// Stable string form for storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Frequency => "frequency",
            Self::Volume => "volume",
            Self::Measurement => "measurement",
        }
    }
}

impl Display for GoalKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Body measurement categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    /// Body weight in kg
    BodyWeight,
    /// Body fat percentage
    BodyFatPercent,
    /// Chest circumference in cm
    Chest,
    /// Waist circumference in cm
    Waist,
    /// Hip circumference in cm
    Hips,
    /// Upper-arm circumference in cm
    Biceps,
    /// Thigh circumference in cm
    Thigh,
}

/// Muscle groups used by the muscle-distribution stat
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    /// Pectorals
    Chest,
    /// Lats, traps, rhomboids
    Back,
    /// Deltoids
    Shoulders,
    /// Biceps
    Biceps,
    /// Triceps
    Triceps,
    /// Quadriceps
    Quads,
    /// Hamstrings
    Hamstrings,
    /// Glutes
    Glutes,
    /// Calves
    Calves,
    /// Abdominals and lower back
    Core,
    /// Compound/full-body movements
    FullBody,
}

impl MuscleGroup {
    /// Stable label for stats rendering
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::Back => "back",
            Self::Shoulders => "shoulders",
            Self::Biceps => "biceps",
            Self::Triceps => "triceps",
            Self::Quads => "quads",
            Self::Hamstrings => "hamstrings",
            Self::Glutes => "glutes",
            Self::Calves => "calves",
            Self::Core => "core",
            Self::FullBody => "full_body",
        }
    }
}

impl Display for MuscleGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

bitflags! {
    /// Changed-field set reported with a workout update event.
    ///
    /// Drives the exact cache-invalidation mapping in `stats`: timestamp
    /// changes invalidate every windowed stat, a name change only the
    /// metrics that surface the name, a notes-only change nothing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WorkoutChanges: u8 {
        /// `started_at` changed
        const STARTED_AT = 0b0000_0001;
        /// `ended_at` changed
        const ENDED_AT = 0b0000_0010;
        /// `name` changed
        const NAME = 0b0000_0100;
        /// `notes` changed
        const NOTES = 0b0000_1000;
    }
}

/// Exercise catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    /// Unique exercise identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Primary muscle group for distribution stats
    pub muscle_group: MuscleGroup,
}

/// A single logged set within a workout line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Set {
    /// Unique set identifier
    pub id: Uuid,
    /// Workout line this set belongs to
    pub workout_line_id: Uuid,
    /// Weight lifted in kg, if applicable
    pub weight_kg: Option<f64>,
    /// Repetitions performed, if applicable
    pub reps: Option<u32>,
    /// Duration in seconds for timed sets
    pub duration_seconds: Option<u32>,
    /// Distance in km for distance sets
    pub distance_km: Option<f64>,
    /// Warmup sets never count toward records
    pub is_warmup: bool,
    /// Only completed sets count toward records
    pub is_completed: bool,
    /// When the set was logged
    pub created_at: DateTime<Utc>,
}

impl Set {
    /// Volume contribution of this set: weight x reps when both are
    /// present, else 0 (a set missing either never contributes to
    /// volume-based records or aggregates).
    #[must_use]
    pub fn volume_kg(&self) -> f64 {
        crate::formulas::set_volume(self.weight_kg, self.reps)
    }

    /// Whether this set may produce personal-record candidates.
    /// Warmup and incomplete sets are excluded by policy.
    #[must_use]
    pub const fn is_record_eligible(&self) -> bool {
        self.is_completed && !self.is_warmup
    }

    /// Reject data-integrity violations before any recomputation runs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for negative weight or distance values.
    pub fn validate(&self) -> AppResult<()> {
        if self.weight_kg.is_some_and(|w| w < 0.0) {
            return Err(AppError::invalid_input("set weight must be non-negative")
                .with_resource_id(self.id.to_string()));
        }
        if self.distance_km.is_some_and(|d| d < 0.0) {
            return Err(
                AppError::invalid_input("set distance must be non-negative")
                    .with_resource_id(self.id.to_string()),
            );
        }
        Ok(())
    }
}

/// A workout line groups the sets of one exercise within a workout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutLine {
    /// Unique line identifier
    pub id: Uuid,
    /// Owning workout
    pub workout_id: Uuid,
    /// Exercise performed on this line
    pub exercise_id: Uuid,
    /// Display order within the workout
    pub position: u32,
}

/// A logged workout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    /// Unique workout identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// Session start
    pub started_at: DateTime<Utc>,
    /// Session end; `None` while in progress
    pub ended_at: Option<DateTime<Utc>>,
    /// Denormalized total volume in kg, owned by the engine
    pub volume_kg: f64,
}

impl Workout {
    /// A workout with `ended_at` set is finished and immutable to
    /// set/line mutation.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Entry-point guard for the CRUD layer: set/line mutations on a
    /// finished workout must be rejected before the engine is invoked.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutFinished` when `ended_at` is set.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.is_finished() {
            return Err(AppError::workout_finished(self.id));
        }
        Ok(())
    }

    /// Session duration, available once the workout is finished
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|ended| ended - self.started_at)
    }
}

/// A logged body measurement reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyMeasurement {
    /// Unique measurement identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Measurement category
    pub kind: MeasurementKind,
    /// Reading value (kg, cm, or percent depending on kind)
    pub value: f64,
    /// When the reading was taken
    pub recorded_at: DateTime<Utc>,
}

impl BodyMeasurement {
    /// Reject data-integrity violations before goal updates run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for negative readings.
    pub fn validate(&self) -> AppResult<()> {
        if self.value < 0.0 {
            return Err(
                AppError::invalid_input("measurement value must be non-negative")
                    .with_resource_id(self.id.to_string()),
            );
        }
        Ok(())
    }
}

/// A tracked habit with engine-owned streak fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    /// Unique habit identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Running consecutive-day streak, owned by the engine
    pub current_streak: u32,
    /// All-time longest streak, never decremented
    pub longest_streak: u32,
    /// Most recent log timestamp seen
    pub last_logged_at: Option<DateTime<Utc>>,
}

/// A single habit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitLog {
    /// Unique log identifier
    pub id: Uuid,
    /// Habit being logged
    pub habit_id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// When the habit was performed
    pub logged_at: DateTime<Utc>,
}

/// A user goal with engine-owned progress fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique goal identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Goal category
    pub kind: GoalKind,
    /// Subject exercise for weight goals
    pub exercise_id: Option<Uuid>,
    /// Subject measurement for measurement goals
    pub measurement_kind: Option<MeasurementKind>,
    /// Value to reach
    pub target_value: f64,
    /// Value when the goal was created
    pub start_value: f64,
    /// Latest observed value, owned by the engine
    pub current_value: f64,
    /// Normalized progress percentage [0, 100], owned by the engine
    pub progress_percent: f64,
    /// Set exactly once on first target-crossing; never cleared here
    pub completed_at: Option<DateTime<Utc>>,
    /// When the goal was created
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Whether the target lies above the start value ("more is better")
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.target_value > self.start_value
    }
}

/// A personal record for one (user, exercise, kind) tuple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalRecord {
    /// Unique record identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Exercise the record belongs to
    pub exercise_id: Uuid,
    /// Record category
    pub kind: RecordKind,
    /// Best recorded value; monotonically non-decreasing except after
    /// deletion or downward edit of the record-holding set
    pub value: f64,
    /// Companion value (reps behind a weight record, weight behind a
    /// volume record)
    pub secondary_value: Option<f64>,
    /// When the record was achieved
    pub achieved_at: DateTime<Utc>,
    /// Originating workout, when known
    pub workout_id: Option<Uuid>,
    /// Originating set, when known
    pub set_id: Option<Uuid>,
}

/// Achievement catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique achievement identifier
    pub id: Uuid,
    /// Stable slug for lookup
    pub slug: String,
    /// Display name
    pub name: String,
    /// Qualifying fact category
    pub kind: AchievementKind,
    /// Threshold for milestone kinds (streak days, volume kg)
    pub threshold: Option<f64>,
    /// Display grouping
    pub category: String,
}

/// Qualifying fact categories for achievements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    /// First workout ever logged
    FirstWorkout,
    /// Any new personal record
    PersonalRecord,
    /// Consecutive-day streak reaching the threshold
    StreakDays,
    /// Cumulative volume reaching the threshold
    TotalVolume,
}

/// Unlock row, unique per (user, achievement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievement {
    /// Owning user
    pub user_id: Uuid,
    /// Unlocked achievement
    pub achievement_id: Uuid,
    /// When the achievement was unlocked
    pub achieved_at: DateTime<Utc>,
}

/// Per-user notification opt-ins consulted by the engine when deciding
/// whether to emit a dispatch decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Notify on new personal records
    pub personal_record: bool,
    /// Notify on achievement unlocks
    pub achievement: bool,
    /// Notify on goal completion
    pub goal_completed: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            personal_record: true,
            achievement: true,
            goal_completed: true,
        }
    }
}

/// User account with engine-owned aggregate fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address
    pub email: String,
    /// Display name
    pub display_name: Option<String>,
    /// Biological gender for formula parameterization
    pub gender: Option<Gender>,
    /// Age in years
    pub age: Option<u32>,
    /// Height in cm
    pub height_cm: Option<f64>,
    /// Body weight in kg
    pub weight_kg: Option<f64>,
    /// Self-reported activity level
    pub activity_level: Option<ActivityLevel>,
    /// Current training goal
    pub training_goal: Option<TrainingGoal>,
    /// Minutes east of UTC for local calendar-day computation
    pub utc_offset_minutes: i32,
    /// Running consecutive-day workout streak, owned by the engine
    pub current_streak: u32,
    /// All-time longest streak, never decremented
    pub longest_streak: u32,
    /// Most recent workout timestamp seen; never regressed by backdated
    /// entries
    pub last_workout_at: Option<DateTime<Utc>>,
    /// Cumulative training volume in kg, owned by the engine
    pub total_volume_kg: f64,
    /// Notification opt-ins
    pub notification_preferences: NotificationPreferences,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Calendar day of `ts` in this user's local timezone.
    /// Falls back to UTC when the stored offset is out of range.
    #[must_use]
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).map_or_else(
            || ts.date_naive(),
            |offset| ts.with_timezone(&offset).date_naive(),
        )
    }
}
