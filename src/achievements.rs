// ABOUTME: Achievement evaluator unlocking catalog entries at most once per user
// ABOUTME: Store uniqueness guarantees idempotence; repeat facts never double-notify
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

//! Achievement Evaluator
//!
//! Consumes qualifying facts (first workout, a new record, a streak
//! milestone, a volume milestone) and unlocks every matching catalog
//! entry. The (user, achievement) uniqueness constraint in the store
//! makes repeat unlocks a silent no-op, so callers can evaluate the same
//! fact any number of times without double-unlocking or double-notifying.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::achievements::{STREAK_MILESTONE_DAYS, VOLUME_MILESTONES_KG};
use crate::errors::{AppError, AppResult};
use crate::models::{Achievement, AchievementKind};
use crate::store::EntityStore;

/// A qualifying fact observed by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AchievementFact {
    /// The user logged their first workout ever
    FirstWorkout,
    /// The user set a new personal record
    PersonalRecord,
    /// The user's streak reached this many consecutive days
    StreakDays(u32),
    /// The user's cumulative volume reached this many kg
    TotalVolume(f64),
}

impl AchievementFact {
    /// Whether this fact satisfies a catalog entry
    #[must_use]
    pub fn satisfies(&self, achievement: &Achievement) -> bool {
        match (achievement.kind, self) {
            (AchievementKind::FirstWorkout, Self::FirstWorkout)
            | (AchievementKind::PersonalRecord, Self::PersonalRecord) => true,
            (AchievementKind::StreakDays, Self::StreakDays(days)) => achievement
                .threshold
                .is_some_and(|threshold| f64::from(*days) >= threshold),
            (AchievementKind::TotalVolume, Self::TotalVolume(volume_kg)) => achievement
                .threshold
                .is_some_and(|threshold| *volume_kg >= threshold),
            _ => false,
        }
    }
}

/// Evaluates facts against the achievement catalog
#[derive(Clone)]
pub struct AchievementEvaluator<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> AchievementEvaluator<S> {
    /// Create an evaluator over the given store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Unlock every catalog entry the fact satisfies. Returns only the
    /// achievements newly unlocked by this call; entries already held
    /// are skipped silently.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the catalog read or an unlock write
    /// fails.
    pub async fn evaluate(
        &self,
        user_id: Uuid,
        fact: AchievementFact,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Achievement>> {
        let catalog = self
            .store
            .list_achievements()
            .await
            .map_err(AppError::from)?;

        let mut unlocked = Vec::new();
        for achievement in catalog {
            if !fact.satisfies(&achievement) {
                continue;
            }
            let inserted = self
                .store
                .try_unlock_achievement(user_id, achievement.id, at)
                .await
                .map_err(AppError::from)?;
            if inserted {
                info!(
                    user_id = %user_id,
                    slug = %achievement.slug,
                    "achievement unlocked"
                );
                unlocked.push(achievement);
            } else {
                debug!(
                    user_id = %user_id,
                    slug = %achievement.slug,
                    "achievement already held"
                );
            }
        }
        Ok(unlocked)
    }
}

/// The built-in achievement catalog. Hosts seed their store with this
/// (or their own) catalog; the evaluator only reads what the store holds.
#[must_use]
pub fn default_catalog() -> Vec<Achievement> {
    let mut catalog = vec![
        Achievement {
            id: Uuid::new_v4(),
            slug: "first-workout".to_owned(),
            name: "First Workout".to_owned(),
            kind: AchievementKind::FirstWorkout,
            threshold: None,
            category: "milestones".to_owned(),
        },
        Achievement {
            id: Uuid::new_v4(),
            slug: "record-breaker".to_owned(),
            name: "Record Breaker".to_owned(),
            kind: AchievementKind::PersonalRecord,
            threshold: None,
            category: "strength".to_owned(),
        },
    ];

    for days in STREAK_MILESTONE_DAYS {
        catalog.push(Achievement {
            id: Uuid::new_v4(),
            slug: format!("streak-{days}"),
            name: format!("{days}-Day Streak"),
            kind: AchievementKind::StreakDays,
            threshold: Some(f64::from(days)),
            category: "consistency".to_owned(),
        });
    }

    for volume_kg in VOLUME_MILESTONES_KG {
        catalog.push(Achievement {
            id: Uuid::new_v4(),
            slug: format!("volume-{}", volume_kg as u64),
            name: format!("{} kg Lifted", volume_kg as u64),
            kind: AchievementKind::TotalVolume,
            threshold: Some(volume_kg),
            category: "volume".to_owned(),
        });
    }

    catalog
}
