// ABOUTME: Engine configuration structs with defaults sourced from constants
// ABOUTME: Formula coefficients, streak behavior, and macro-split tuning knobs
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! Engine configuration. Every knob defaults to the published formula
//! coefficients in `constants`; deployments override the tunable subset
//! through environment variables.

use std::env;

use crate::constants::{activity_factors, bmr, macros, streaks};
use crate::errors::{AppError, AppResult};

/// Mifflin-St Jeor BMR coefficients
#[derive(Debug, Clone)]
pub struct BmrConfig {
    /// Weight coefficient (kcal per kg)
    pub weight_coef: f64,
    /// Height coefficient (kcal per cm)
    pub height_coef: f64,
    /// Age coefficient (kcal per year)
    pub age_coef: f64,
    /// Additive constant for males
    pub male_constant: f64,
    /// Additive constant for females
    pub female_constant: f64,
}

impl Default for BmrConfig {
    fn default() -> Self {
        Self {
            weight_coef: bmr::WEIGHT_COEF,
            height_coef: bmr::HEIGHT_COEF,
            age_coef: bmr::AGE_COEF,
            male_constant: bmr::MALE_CONSTANT,
            female_constant: bmr::FEMALE_CONSTANT,
        }
    }
}

/// TDEE activity multipliers
#[derive(Debug, Clone)]
pub struct ActivityFactorsConfig {
    /// Little or no exercise
    pub sedentary: f64,
    /// Training 1-3 days/week
    pub lightly_active: f64,
    /// Training 3-5 days/week
    pub moderately_active: f64,
    /// Training 6-7 days/week
    pub very_active: f64,
    /// Hard training twice a day
    pub extra_active: f64,
}

impl Default for ActivityFactorsConfig {
    fn default() -> Self {
        Self {
            sedentary: activity_factors::SEDENTARY,
            lightly_active: activity_factors::LIGHTLY_ACTIVE,
            moderately_active: activity_factors::MODERATELY_ACTIVE,
            very_active: activity_factors::VERY_ACTIVE,
            extra_active: activity_factors::EXTRA_ACTIVE,
        }
    }
}

/// Macro split tuning
#[derive(Debug, Clone)]
pub struct MacroSplitConfig {
    /// TDEE multiplier while cutting
    pub cut_multiplier: f64,
    /// TDEE multiplier while bulking
    pub bulk_multiplier: f64,
    /// TDEE multiplier at maintenance
    pub maintain_multiplier: f64,
    /// Fixed protein target in grams per kg body weight
    pub protein_g_per_kg: f64,
    /// Fat allocation as a fraction of target calories
    pub fat_percent_of_calories: f64,
}

impl Default for MacroSplitConfig {
    fn default() -> Self {
        Self {
            cut_multiplier: macros::CUT_MULTIPLIER,
            bulk_multiplier: macros::BULK_MULTIPLIER,
            maintain_multiplier: macros::MAINTAIN_MULTIPLIER,
            protein_g_per_kg: macros::PROTEIN_G_PER_KG,
            fat_percent_of_calories: macros::FAT_PERCENT_OF_CALORIES,
        }
    }
}

/// Streak behavior
#[derive(Debug, Clone)]
pub struct StreakConfig {
    /// Full calendar days of inactivity after which the displayed
    /// (effective) streak reads zero
    pub effective_grace_days: i64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            effective_grace_days: streaks::EFFECTIVE_STREAK_GRACE_DAYS,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// BMR coefficients
    pub bmr: BmrConfig,
    /// TDEE activity multipliers
    pub activity_factors: ActivityFactorsConfig,
    /// Macro split tuning
    pub macro_split: MacroSplitConfig,
    /// Streak behavior
    pub streak: StreakConfig,
}

impl EngineConfig {
    /// Load configuration with environment overrides applied on top of
    /// the defaults.
    ///
    /// Recognized variables: `IRONLOG_PROTEIN_G_PER_KG`,
    /// `IRONLOG_FAT_PERCENT`, `IRONLOG_STREAK_GRACE_DAYS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a set variable fails to parse or is out
    /// of range.
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(value) = parse_env_f64("IRONLOG_PROTEIN_G_PER_KG")? {
            if !(0.5..=4.0).contains(&value) {
                return Err(AppError::config(
                    "IRONLOG_PROTEIN_G_PER_KG must be between 0.5 and 4.0",
                ));
            }
            config.macro_split.protein_g_per_kg = value;
        }

        if let Some(value) = parse_env_f64("IRONLOG_FAT_PERCENT")? {
            if !(0.10..=0.50).contains(&value) {
                return Err(AppError::config(
                    "IRONLOG_FAT_PERCENT must be between 0.10 and 0.50",
                ));
            }
            config.macro_split.fat_percent_of_calories = value;
        }

        if let Ok(raw) = env::var("IRONLOG_STREAK_GRACE_DAYS") {
            let value: i64 = raw.parse().map_err(|_| {
                AppError::config("IRONLOG_STREAK_GRACE_DAYS must be an integer")
            })?;
            if !(0..=7).contains(&value) {
                return Err(AppError::config(
                    "IRONLOG_STREAK_GRACE_DAYS must be between 0 and 7",
                ));
            }
            config.streak.effective_grace_days = value;
        }

        Ok(config)
    }
}

fn parse_env_f64(name: &str) -> AppResult<Option<f64>> {
    match env::var(name) {
        Ok(raw) => {
            let value: f64 = raw
                .parse()
                .map_err(|_| AppError::config(format!("{name} must be a number")))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}
