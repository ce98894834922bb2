// ABOUTME: Shared test utilities and builders for integration tests
// ABOUTME: Provides engine harness, entity builders, and quiet logging setup
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]

//! Shared test utilities for `ironlog_engine`
//!
//! Common builders and setup functions to reduce duplication across
//! integration tests.

use std::sync::{Arc, Once};

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ironlog_engine::{
    cache::{memory::InMemoryCache, CacheConfig, CacheProvider},
    config::EngineConfig,
    engine::MetricsEngine,
    models::{
        BodyMeasurement, Exercise, Goal, GoalKind, Habit, MeasurementKind, MuscleGroup,
        NotificationPreferences, Set, User, Workout, WorkoutLine,
    },
    notifications::RecordingSink,
    store::memory::InMemoryStore,
};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// Engine wired over in-memory store, cache, and a recording sink
pub struct TestHarness {
    pub store: InMemoryStore,
    pub cache: InMemoryCache,
    pub sink: RecordingSink,
    pub engine: MetricsEngine<InMemoryStore, InMemoryCache>,
}

/// Standard engine setup for integration tests
pub async fn create_test_engine() -> Result<TestHarness> {
    init_test_logging();
    let store = InMemoryStore::new();
    let cache = InMemoryCache::new(CacheConfig {
        enable_background_cleanup: false, // avoid runtime conflicts in tests
        ..CacheConfig::default()
    })
    .await?;
    let sink = RecordingSink::new();
    let engine = MetricsEngine::new(
        store.clone(),
        cache.clone(),
        &EngineConfig::default(),
        Arc::new(sink.clone()),
    );
    Ok(TestHarness {
        store,
        cache,
        sink,
        engine,
    })
}

/// Fixed timestamp helper (UTC)
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Timestamp `days` days before now (for window-relative stats tests)
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub fn test_user() -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("lifter-{}@example.com", Uuid::new_v4()),
        display_name: Some("Test Lifter".to_owned()),
        gender: None,
        age: Some(30),
        height_cm: Some(180.0),
        weight_kg: Some(80.0),
        activity_level: None,
        training_goal: None,
        utc_offset_minutes: 0,
        current_streak: 0,
        longest_streak: 0,
        last_workout_at: None,
        total_volume_kg: 0.0,
        notification_preferences: NotificationPreferences::default(),
        created_at: at(2025, 1, 1, 0),
    }
}

pub fn test_exercise(name: &str, muscle_group: MuscleGroup) -> Exercise {
    Exercise {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        muscle_group,
    }
}

pub fn test_workout(user_id: Uuid, started_at: DateTime<Utc>) -> Workout {
    Workout {
        id: Uuid::new_v4(),
        user_id,
        name: "Training session".to_owned(),
        notes: None,
        started_at,
        ended_at: None,
        volume_kg: 0.0,
    }
}

pub fn test_line(workout_id: Uuid, exercise_id: Uuid) -> WorkoutLine {
    WorkoutLine {
        id: Uuid::new_v4(),
        workout_id,
        exercise_id,
        position: 0,
    }
}

pub fn test_set(workout_line_id: Uuid, weight_kg: Option<f64>, reps: Option<u32>) -> Set {
    Set {
        id: Uuid::new_v4(),
        workout_line_id,
        weight_kg,
        reps,
        duration_seconds: None,
        distance_km: None,
        is_warmup: false,
        is_completed: true,
        created_at: Utc::now(),
    }
}

pub fn test_goal(user_id: Uuid, kind: GoalKind, start: f64, target: f64) -> Goal {
    Goal {
        id: Uuid::new_v4(),
        user_id,
        kind,
        exercise_id: None,
        measurement_kind: None,
        target_value: target,
        start_value: start,
        current_value: start,
        progress_percent: 0.0,
        completed_at: None,
        created_at: at(2025, 1, 1, 0),
    }
}

pub fn test_measurement(
    user_id: Uuid,
    kind: MeasurementKind,
    value: f64,
    recorded_at: DateTime<Utc>,
) -> BodyMeasurement {
    BodyMeasurement {
        id: Uuid::new_v4(),
        user_id,
        kind,
        value,
        recorded_at,
    }
}

pub fn test_habit(user_id: Uuid, name: &str) -> Habit {
    Habit {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_owned(),
        current_streak: 0,
        longest_streak: 0,
        last_logged_at: None,
    }
}

/// Seed a user with one workout, one line on the given exercise, and
/// return the (workout, line) pair
pub fn seed_workout_line(
    store: &InMemoryStore,
    user: &User,
    exercise: &Exercise,
    started_at: DateTime<Utc>,
) -> (Workout, WorkoutLine) {
    let workout = test_workout(user.id, started_at);
    let line = test_line(workout.id, exercise.id);
    store.put_workout(workout.clone());
    store.put_workout_line(line.clone());
    (workout, line)
}
