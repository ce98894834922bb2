// ABOUTME: Integration tests for cache-backed statistics and selective invalidation
// ABOUTME: Covers windowing, distributions, cold-cache equality, and the exact invalidation map
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

mod common;

use anyhow::Result;
use chrono::Duration;
use common::{
    create_test_engine, days_ago, test_exercise, test_line, test_set, test_user, test_workout,
};
use ironlog_engine::{
    cache::{CacheKey, CacheProvider, CacheTtlConfig, StatsMetric},
    models::{MuscleGroup, WorkoutChanges},
    stats::StatsService,
    store::memory::InMemoryStore,
};

type Harness = common::TestHarness;

fn stats_service(harness: &Harness) -> StatsService<InMemoryStore, ironlog_engine::cache::memory::InMemoryCache> {
    StatsService::new(
        harness.store.clone(),
        harness.cache.clone(),
        CacheTtlConfig::default(),
    )
}

#[tokio::test]
async fn test_volume_trend_windows_and_orders_workouts() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());

    let mut old = test_workout(user.id, days_ago(40));
    old.volume_kg = 999.0;
    let mut earlier = test_workout(user.id, days_ago(10));
    earlier.volume_kg = 500.0;
    earlier.name = "Pull day".to_string();
    let mut recent = test_workout(user.id, days_ago(2));
    recent.volume_kg = 800.0;
    recent.name = "Push day".to_string();
    for workout in [&old, &earlier, &recent] {
        harness.store.put_workout(workout.clone());
    }

    let stats = stats_service(&harness);
    let trend = stats.volume_trend(user.id, 30).await?;

    // The 40-day-old workout falls outside the window; order is oldest first
    assert_eq!(trend.len(), 2);
    assert_eq!(trend[0].label, "Pull day");
    assert!((trend[0].value - 500.0).abs() < f64::EPSILON);
    assert_eq!(trend[1].label, "Push day");
    assert!((trend[1].value - 800.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn test_muscle_distribution_sums_volume_per_group() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());

    let bench = test_exercise("Bench Press", MuscleGroup::Chest);
    let squat = test_exercise("Squat", MuscleGroup::Quads);
    harness.store.put_exercise(bench.clone());
    harness.store.put_exercise(squat.clone());

    let workout = test_workout(user.id, days_ago(3));
    harness.store.put_workout(workout.clone());
    let bench_line = test_line(workout.id, bench.id);
    let squat_line = test_line(workout.id, squat.id);
    harness.store.put_workout_line(bench_line.clone());
    harness.store.put_workout_line(squat_line.clone());

    harness
        .store
        .put_set(test_set(bench_line.id, Some(100.0), Some(5))); // 500
    harness
        .store
        .put_set(test_set(bench_line.id, Some(80.0), Some(10))); // 800
    harness
        .store
        .put_set(test_set(squat_line.id, Some(120.0), Some(5))); // 600

    let stats = stats_service(&harness);
    let distribution = stats.muscle_distribution(user.id, 30).await?;

    assert_eq!(distribution.len(), 2);
    let chest = distribution
        .iter()
        .find(|slice| slice.label == "chest")
        .expect("chest slice");
    assert!((chest.value - 1300.0).abs() < f64::EPSILON);
    let quads = distribution
        .iter()
        .find(|slice| slice.label == "quads")
        .expect("quads slice");
    assert!((quads.value - 600.0).abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn test_duration_distribution_buckets_finished_workouts() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());

    // 25 min, 50 min, 120 min finished sessions; one unfinished ignored
    for minutes in [25, 50, 120] {
        let started = days_ago(5);
        let mut workout = test_workout(user.id, started);
        workout.ended_at = Some(started + Duration::minutes(minutes));
        harness.store.put_workout(workout);
    }
    harness.store.put_workout(test_workout(user.id, days_ago(4)));

    let stats = stats_service(&harness);
    let distribution = stats.duration_distribution(user.id, 30).await?;

    let by_label = |label: &str| {
        distribution
            .iter()
            .find(|slice| slice.label == label)
            .map(|slice| slice.value)
            .unwrap_or_default()
    };
    assert!((by_label("<30m") - 1.0).abs() < f64::EPSILON);
    assert!((by_label("45-60m") - 1.0).abs() < f64::EPSILON);
    assert!((by_label(">90m") - 1.0).abs() < f64::EPSILON);
    assert!(by_label("30-45m").abs() < f64::EPSILON);
    Ok(())
}

#[tokio::test]
async fn test_duration_history_is_newest_first_and_limited() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());

    for (days, minutes) in [(5, 30), (3, 45), (1, 60)] {
        let started = days_ago(days);
        let mut workout = test_workout(user.id, started);
        workout.ended_at = Some(started + Duration::minutes(minutes));
        harness.store.put_workout(workout);
    }

    let stats = stats_service(&harness);
    let history = stats.duration_history(user.id, 2).await?;

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].value, 60);
    assert_eq!(history[1].value, 45);
    Ok(())
}

#[tokio::test]
async fn test_cold_cache_reproduces_identical_results() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());

    let mut workout = test_workout(user.id, days_ago(2));
    workout.volume_kg = 750.0;
    harness.store.put_workout(workout);

    let stats = stats_service(&harness);
    let warm = stats.volume_trend(user.id, 30).await?;

    // Drop the cache entirely; recomputation must be byte-identical
    harness.cache.clear_all().await?;
    let cold = stats.volume_trend(user.id, 30).await?;
    assert_eq!(warm, cold);
    Ok(())
}

#[tokio::test]
async fn test_timestamp_change_invalidates_all_windowed_stats() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());
    harness.store.put_workout(test_workout(user.id, days_ago(2)));

    let stats = stats_service(&harness);
    stats.volume_trend(user.id, 30).await?;
    stats.muscle_distribution(user.id, 30).await?;
    stats.duration_distribution(user.id, 30).await?;

    stats
        .invalidate_for_workout_update(user.id, WorkoutChanges::STARTED_AT)
        .await;

    for metric in [
        StatsMetric::VolumeTrend { days: 30 },
        StatsMetric::MuscleDistribution { days: 30 },
        StatsMetric::DurationDistribution { days: 30 },
    ] {
        assert!(
            !harness.cache.exists(&CacheKey::new(user.id, metric)).await?,
            "{} should be invalidated",
            metric.name()
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_name_change_invalidates_only_volume_trend() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());
    harness.store.put_workout(test_workout(user.id, days_ago(2)));

    let stats = stats_service(&harness);
    stats.volume_trend(user.id, 30).await?;
    stats.muscle_distribution(user.id, 30).await?;
    stats.duration_distribution(user.id, 30).await?;

    stats
        .invalidate_for_workout_update(user.id, WorkoutChanges::NAME)
        .await;

    let trend_key = CacheKey::new(user.id, StatsMetric::VolumeTrend { days: 30 });
    let muscle_key = CacheKey::new(user.id, StatsMetric::MuscleDistribution { days: 30 });
    let duration_key = CacheKey::new(user.id, StatsMetric::DurationDistribution { days: 30 });

    assert!(!harness.cache.exists(&trend_key).await?);
    assert!(harness.cache.exists(&muscle_key).await?);
    assert!(harness.cache.exists(&duration_key).await?);
    Ok(())
}

#[tokio::test]
async fn test_notes_only_change_invalidates_nothing() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());
    harness.store.put_workout(test_workout(user.id, days_ago(2)));

    let stats = stats_service(&harness);
    stats.volume_trend(user.id, 30).await?;
    stats.muscle_distribution(user.id, 30).await?;

    stats
        .invalidate_for_workout_update(user.id, WorkoutChanges::NOTES)
        .await;

    let trend_key = CacheKey::new(user.id, StatsMetric::VolumeTrend { days: 30 });
    let muscle_key = CacheKey::new(user.id, StatsMetric::MuscleDistribution { days: 30 });
    assert!(harness.cache.exists(&trend_key).await?);
    assert!(harness.cache.exists(&muscle_key).await?);
    Ok(())
}

#[tokio::test]
async fn test_set_change_leaves_duration_stats_cached() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    harness.store.put_user(user.clone());
    harness.store.put_workout(test_workout(user.id, days_ago(2)));

    let stats = stats_service(&harness);
    stats.volume_trend(user.id, 30).await?;
    stats.muscle_distribution(user.id, 30).await?;
    stats.duration_distribution(user.id, 30).await?;

    stats.invalidate_for_set_change(user.id).await;

    let trend_key = CacheKey::new(user.id, StatsMetric::VolumeTrend { days: 30 });
    let muscle_key = CacheKey::new(user.id, StatsMetric::MuscleDistribution { days: 30 });
    let duration_key = CacheKey::new(user.id, StatsMetric::DurationDistribution { days: 30 });

    assert!(!harness.cache.exists(&trend_key).await?);
    assert!(!harness.cache.exists(&muscle_key).await?);
    assert!(harness.cache.exists(&duration_key).await?);
    Ok(())
}
