// ABOUTME: In-memory entity store used by tests and embedded deployments
// ABOUTME: DashMap-backed collections with the same contract as a SQL backend
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{EntityStore, SetContext};
use crate::models::{
    Achievement, Exercise, Goal, Habit, PersonalRecord, RecordKind, Set, User, UserAchievement,
    Workout, WorkoutLine,
};

/// In-memory reference store.
///
/// Collections are concurrent maps; the engine provides its own per-user
/// serialization, so plain map operations are sufficient here. Raw-record
/// writes (`put_*` / `remove_set`) are inherent methods rather than trait
/// methods: they model the excluded CRUD layer, which persists first and
/// then hands events to the engine.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<DashMap<Uuid, User>>,
    exercises: Arc<DashMap<Uuid, Exercise>>,
    workouts: Arc<DashMap<Uuid, Workout>>,
    lines: Arc<DashMap<Uuid, WorkoutLine>>,
    sets: Arc<DashMap<Uuid, Set>>,
    records: Arc<DashMap<(Uuid, Uuid, RecordKind), PersonalRecord>>,
    goals: Arc<DashMap<Uuid, Goal>>,
    habits: Arc<DashMap<Uuid, Habit>>,
    achievements: Arc<DashMap<Uuid, Achievement>>,
    user_achievements: Arc<DashMap<(Uuid, Uuid), UserAchievement>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record
    pub fn put_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Insert or replace an exercise record
    pub fn put_exercise(&self, exercise: Exercise) {
        self.exercises.insert(exercise.id, exercise);
    }

    /// Insert or replace a workout record
    pub fn put_workout(&self, workout: Workout) {
        self.workouts.insert(workout.id, workout);
    }

    /// Insert or replace a workout line record
    pub fn put_workout_line(&self, line: WorkoutLine) {
        self.lines.insert(line.id, line);
    }

    /// Insert or replace a set record
    pub fn put_set(&self, set: Set) {
        self.sets.insert(set.id, set);
    }

    /// Remove a set record (the CRUD layer deletes before notifying the
    /// engine)
    pub fn remove_set(&self, set_id: Uuid) {
        self.sets.remove(&set_id);
    }

    /// Insert or replace a goal record
    pub fn put_goal(&self, goal: Goal) {
        self.goals.insert(goal.id, goal);
    }

    /// Insert or replace a habit record
    pub fn put_habit(&self, habit: Habit) {
        self.habits.insert(habit.id, habit);
    }

    /// Insert or replace an achievement catalog entry
    pub fn put_achievement(&self, achievement: Achievement) {
        self.achievements.insert(achievement.id, achievement);
    }

    fn line_ids_for_workout(&self, workout_id: Uuid) -> Vec<Uuid> {
        self.lines
            .iter()
            .filter(|entry| entry.workout_id == workout_id)
            .map(|entry| entry.id)
            .collect()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn update_user_streak(
        &self,
        user_id: Uuid,
        current_streak: u32,
        longest_streak: u32,
        last_workout_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.current_streak = current_streak;
            user.longest_streak = longest_streak;
            user.last_workout_at = last_workout_at;
        }
        Ok(())
    }

    async fn update_user_total_volume(&self, user_id: Uuid, total_volume_kg: f64) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.total_volume_kg = total_volume_kg;
        }
        Ok(())
    }

    async fn get_exercise(&self, exercise_id: Uuid) -> Result<Option<Exercise>> {
        Ok(self.exercises.get(&exercise_id).map(|e| e.clone()))
    }

    async fn get_workout(&self, workout_id: Uuid) -> Result<Option<Workout>> {
        Ok(self.workouts.get(&workout_id).map(|w| w.clone()))
    }

    async fn list_user_workouts(&self, user_id: Uuid) -> Result<Vec<Workout>> {
        let mut workouts: Vec<Workout> = self
            .workouts
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        workouts.sort_by_key(|w| w.started_at);
        Ok(workouts)
    }

    async fn update_workout_volume(&self, workout_id: Uuid, volume_kg: f64) -> Result<()> {
        if let Some(mut workout) = self.workouts.get_mut(&workout_id) {
            workout.volume_kg = volume_kg;
        }
        Ok(())
    }

    async fn get_workout_line(&self, line_id: Uuid) -> Result<Option<WorkoutLine>> {
        Ok(self.lines.get(&line_id).map(|l| l.clone()))
    }

    async fn list_workout_lines(&self, workout_id: Uuid) -> Result<Vec<WorkoutLine>> {
        let mut lines: Vec<WorkoutLine> = self
            .lines
            .iter()
            .filter(|entry| entry.workout_id == workout_id)
            .map(|entry| entry.clone())
            .collect();
        lines.sort_by_key(|l| l.position);
        Ok(lines)
    }

    async fn list_workout_sets(&self, workout_id: Uuid) -> Result<Vec<Set>> {
        let line_ids = self.line_ids_for_workout(workout_id);
        let mut sets: Vec<Set> = self
            .sets
            .iter()
            .filter(|entry| line_ids.contains(&entry.workout_line_id))
            .map(|entry| entry.clone())
            .collect();
        sets.sort_by_key(|s| s.created_at);
        Ok(sets)
    }

    async fn list_exercise_sets(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
    ) -> Result<Vec<SetContext>> {
        let mut rows = Vec::new();
        for line in self
            .lines
            .iter()
            .filter(|entry| entry.exercise_id == exercise_id)
        {
            let Some(workout) = self.workouts.get(&line.workout_id) else {
                continue;
            };
            if workout.user_id != user_id {
                continue;
            }
            for set in self.sets.iter().filter(|s| s.workout_line_id == line.id) {
                rows.push(SetContext {
                    set: set.clone(),
                    workout_id: workout.id,
                    workout_started_at: workout.started_at,
                });
            }
        }
        rows.sort_by_key(|row| row.set.created_at);
        Ok(rows)
    }

    async fn get_personal_record(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        kind: RecordKind,
    ) -> Result<Option<PersonalRecord>> {
        Ok(self
            .records
            .get(&(user_id, exercise_id, kind))
            .map(|r| r.clone()))
    }

    async fn upsert_personal_record(&self, record: &PersonalRecord) -> Result<()> {
        self.records.insert(
            (record.user_id, record.exercise_id, record.kind),
            record.clone(),
        );
        Ok(())
    }

    async fn delete_personal_record(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        kind: RecordKind,
    ) -> Result<()> {
        self.records.remove(&(user_id, exercise_id, kind));
        Ok(())
    }

    async fn list_personal_records(&self, user_id: Uuid) -> Result<Vec<PersonalRecord>> {
        let mut records: Vec<PersonalRecord> = self
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        records.sort_by_key(|r| r.achieved_at);
        Ok(records)
    }

    async fn list_user_goals(&self, user_id: Uuid) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self
            .goals
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        goals.sort_by_key(|g| g.created_at);
        Ok(goals)
    }

    async fn update_goal(&self, goal: &Goal) -> Result<()> {
        self.goals.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn get_habit(&self, habit_id: Uuid) -> Result<Option<Habit>> {
        Ok(self.habits.get(&habit_id).map(|h| h.clone()))
    }

    async fn update_habit_streak(
        &self,
        habit_id: Uuid,
        current_streak: u32,
        longest_streak: u32,
        last_logged_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(mut habit) = self.habits.get_mut(&habit_id) {
            habit.current_streak = current_streak;
            habit.longest_streak = longest_streak;
            habit.last_logged_at = last_logged_at;
        }
        Ok(())
    }

    async fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let mut achievements: Vec<Achievement> = self
            .achievements
            .iter()
            .map(|entry| entry.clone())
            .collect();
        achievements.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(achievements)
    }

    async fn try_unlock_achievement(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
        achieved_at: DateTime<Utc>,
    ) -> Result<bool> {
        // DashMap entry API gives the same at-most-once semantics as a
        // unique index: the first writer wins, later attempts are no-ops.
        let mut inserted = false;
        self.user_achievements
            .entry((user_id, achievement_id))
            .or_insert_with(|| {
                inserted = true;
                UserAchievement {
                    user_id,
                    achievement_id,
                    achieved_at,
                }
            });
        Ok(inserted)
    }

    async fn list_user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>> {
        let mut unlocks: Vec<UserAchievement> = self
            .user_achievements
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        unlocks.sort_by_key(|u| u.achieved_at);
        Ok(unlocks)
    }
}
