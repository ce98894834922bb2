// ABOUTME: Integration tests for the personal record synchronizer
// ABOUTME: Covers raise-only semantics, warmup exclusion, idempotence, and recompute-from-history
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

mod common;

use anyhow::Result;
use common::{at, create_test_engine, seed_workout_line, test_exercise, test_set, test_user};
use ironlog_engine::{
    models::{MuscleGroup, RecordKind},
    records::RecordSynchronizer,
    store::EntityStore,
};

#[tokio::test]
async fn test_first_set_creates_all_three_records() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Bench Press", MuscleGroup::Chest);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (workout, line) =
        seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let set = test_set(line.id, Some(100.0), Some(5));
    harness.store.put_set(set.clone());

    let sync = RecordSynchronizer::new(harness.store.clone());
    let raised = sync.sync_set_records(&set).await?;
    assert_eq!(raised.len(), 3);

    let weight = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .expect("max_weight record");
    assert!((weight.value - 100.0).abs() < f64::EPSILON);
    assert_eq!(weight.secondary_value, Some(5.0));
    assert_eq!(weight.achieved_at, workout.started_at);
    assert_eq!(weight.set_id, Some(set.id));

    let one_rm = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxOneRepMax)
        .await?
        .expect("max_1rm record");
    assert!((one_rm.value - 116.67).abs() < 1e-9);

    let volume = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxVolumeSet)
        .await?
        .expect("max_volume_set record");
    assert!((volume.value - 500.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_second_set_updates_only_exceeded_kinds() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Bench Press", MuscleGroup::Chest);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let sync = RecordSynchronizer::new(harness.store.clone());

    let first = test_set(line.id, Some(100.0), Some(5));
    harness.store.put_set(first.clone());
    sync.sync_set_records(&first).await?;

    // volume 900 > 500, 1RM 120 > 116.67, weight 90 < 100
    let second = test_set(line.id, Some(90.0), Some(10));
    harness.store.put_set(second.clone());
    let raised = sync.sync_set_records(&second).await?;
    assert_eq!(raised.len(), 2);

    let weight = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .expect("max_weight record");
    assert!((weight.value - 100.0).abs() < f64::EPSILON);
    assert_eq!(weight.set_id, Some(first.id));

    let one_rm = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxOneRepMax)
        .await?
        .expect("max_1rm record");
    assert!((one_rm.value - 120.0).abs() < 1e-9);
    assert_eq!(one_rm.set_id, Some(second.id));

    let volume = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxVolumeSet)
        .await?
        .expect("max_volume_set record");
    assert!((volume.value - 900.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_warmup_and_incomplete_sets_never_record() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Squat", MuscleGroup::Quads);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let sync = RecordSynchronizer::new(harness.store.clone());

    let mut warmup = test_set(line.id, Some(500.0), Some(1));
    warmup.is_warmup = true;
    harness.store.put_set(warmup.clone());
    assert!(sync.sync_set_records(&warmup).await?.is_empty());

    let mut incomplete = test_set(line.id, Some(500.0), Some(1));
    incomplete.is_completed = false;
    harness.store.put_set(incomplete.clone());
    assert!(sync.sync_set_records(&incomplete).await?.is_empty());

    assert!(harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .is_none());

    Ok(())
}

#[tokio::test]
async fn test_sync_is_idempotent() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Deadlift", MuscleGroup::Back);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let set = test_set(line.id, Some(140.0), Some(3));
    harness.store.put_set(set.clone());

    let sync = RecordSynchronizer::new(harness.store.clone());
    let first_pass = sync.sync_set_records(&set).await?;
    assert_eq!(first_pass.len(), 3);

    let before = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .expect("record after first sync");

    // Replaying the unchanged set raises nothing and rewrites nothing
    let second_pass = sync.sync_set_records(&set).await?;
    assert!(second_pass.is_empty());

    let after = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .expect("record after second sync");
    assert_eq!(before.id, after.id);
    assert_eq!(before.achieved_at, after.achieved_at);
    assert!((before.value - after.value).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_deletion_of_record_holder_recomputes_from_history() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Bench Press", MuscleGroup::Chest);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let sync = RecordSynchronizer::new(harness.store.clone());

    let heavy = test_set(line.id, Some(100.0), Some(5));
    let volume_set = test_set(line.id, Some(90.0), Some(10));
    harness.store.put_set(heavy.clone());
    harness.store.put_set(volume_set.clone());
    sync.sync_set_records(&heavy).await?;
    sync.sync_set_records(&volume_set).await?;

    // Delete the weight-record holder; remaining history takes over
    harness.store.remove_set(heavy.id);
    sync.handle_set_deleted(&heavy).await?;

    let weight = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .expect("recomputed max_weight record");
    assert!((weight.value - 90.0).abs() < f64::EPSILON);
    assert_eq!(weight.set_id, Some(volume_set.id));

    // Records the deleted set did not hold are untouched
    let volume = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxVolumeSet)
        .await?
        .expect("max_volume_set record");
    assert!((volume.value - 900.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_deletion_of_last_eligible_set_removes_records() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Overhead Press", MuscleGroup::Shoulders);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let sync = RecordSynchronizer::new(harness.store.clone());
    let only = test_set(line.id, Some(60.0), Some(8));
    harness.store.put_set(only.clone());
    sync.sync_set_records(&only).await?;

    harness.store.remove_set(only.id);
    sync.handle_set_deleted(&only).await?;

    for kind in RecordKind::ALL {
        assert!(
            harness
                .store
                .get_personal_record(user.id, exercise.id, kind)
                .await?
                .is_none(),
            "{kind} should be deleted"
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_downward_edit_of_record_holder_recomputes() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Row", MuscleGroup::Back);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let sync = RecordSynchronizer::new(harness.store.clone());
    let mut set = test_set(line.id, Some(100.0), Some(5));
    harness.store.put_set(set.clone());
    sync.sync_set_records(&set).await?;

    // Lower the record-holding set; the stale 100 must not survive
    set.weight_kg = Some(80.0);
    harness.store.put_set(set.clone());
    sync.sync_set_records(&set).await?;

    let weight = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
        .await?
        .expect("recomputed record");
    assert!((weight.value - 80.0).abs() < f64::EPSILON);

    let volume = harness
        .store
        .get_personal_record(user.id, exercise.id, RecordKind::MaxVolumeSet)
        .await?
        .expect("recomputed volume record");
    assert!((volume.value - 400.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_max_weight_is_monotonic_over_any_sequence() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Squat", MuscleGroup::Quads);
    harness.store.put_user(user.clone());
    harness.store.put_exercise(exercise.clone());
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let sync = RecordSynchronizer::new(harness.store.clone());
    let weights = [80.0, 120.0, 60.0, 120.0, 100.0, 140.0, 90.0];

    let mut previous = 0.0;
    for weight in weights {
        let set = test_set(line.id, Some(weight), Some(5));
        harness.store.put_set(set.clone());
        sync.sync_set_records(&set).await?;

        let record = harness
            .store
            .get_personal_record(user.id, exercise.id, RecordKind::MaxWeight)
            .await?
            .expect("record present after eligible set");
        assert!(
            record.value >= previous,
            "record dropped from {previous} to {}",
            record.value
        );
        previous = record.value;
    }
    assert!((previous - 140.0).abs() < f64::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_missing_exercise_skips_without_error() -> Result<()> {
    let harness = create_test_engine().await?;
    let user = test_user();
    let exercise = test_exercise("Ghost", MuscleGroup::Core);
    harness.store.put_user(user.clone());
    // Exercise deliberately not inserted
    let (_, line) = seed_workout_line(&harness.store, &user, &exercise, at(2025, 3, 10, 18));

    let set = test_set(line.id, Some(100.0), Some(5));
    harness.store.put_set(set.clone());

    let sync = RecordSynchronizer::new(harness.store.clone());
    let raised = sync.sync_set_records(&set).await?;
    assert!(raised.is_empty());

    Ok(())
}
