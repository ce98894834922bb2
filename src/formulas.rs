// ABOUTME: Pure metric formulas: Epley 1RM, set volume, Wilks score, BMR/TDEE/macros
// ABOUTME: Same inputs always yield same outputs; no side effects, no I/O
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! Metric Formulas
//!
//! Evidence-based strength and nutrition calculations.
//!
//! # Scientific References
//!
//! - Epley, B. (1985). Poundage chart. *Boyd Epley Workout*. Lincoln, NE.
//! - Wilks, R. (1994). Bodyweight correction formula for powerlifting.
//! - Mifflin, M.D., et al. (1990). A new predictive equation for resting
//!   energy expenditure. *American Journal of Clinical Nutrition*, 51(2).
//!   <https://doi.org/10.1093/ajcn/51.2.241>
//! - `McArdle` et al. (2010). *Exercise Physiology* — activity factors.

use serde::{Deserialize, Serialize};

use crate::config::{ActivityFactorsConfig, BmrConfig, MacroSplitConfig};
use crate::constants::{macros, one_rep_max, wilks};
use crate::errors::{AppError, AppResult};
use crate::models::{ActivityLevel, Gender, TrainingGoal};

/// Round to two decimal places (scores and stored record values)
#[must_use]
pub fn round_to_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Estimated one-rep max via the Epley formula:
/// `1rm = weight * (1 + reps / 30)`, rounded to two decimals.
///
/// Returns `None` for zero reps — a 0-rep set has no defined 1RM and must
/// not produce a record.
#[must_use]
pub fn estimated_one_rep_max(weight_kg: f64, reps: u32) -> Option<f64> {
    if reps == 0 {
        return None;
    }
    Some(round_to_2dp(
        weight_kg * (1.0 + f64::from(reps) / one_rep_max::EPLEY_REPS_DIVISOR),
    ))
}

/// Volume of a single set: `weight * reps` when both are present, else 0.
/// A set missing either value never contributes to volume-based records
/// or aggregates.
#[must_use]
pub fn set_volume(weight_kg: Option<f64>, reps: Option<u32>) -> f64 {
    match (weight_kg, reps) {
        (Some(weight), Some(reps)) => weight * f64::from(reps),
        _ => 0.0,
    }
}

/// Wilks score: bodyweight-normalized strength score.
///
/// `score = lifted * 500 / (a + b*x + c*x^2 + d*x^3 + e*x^4 + f*x^5)`
/// with gender-specific coefficients and `x` = body weight in kg.
/// Output rounded to two decimal places.
///
/// # Errors
///
/// Returns `InvalidInput` when the body weight is outside the validated
/// coefficient range or the lifted weight is negative.
pub fn wilks_score(gender: Gender, body_weight_kg: f64, lifted_kg: f64) -> AppResult<f64> {
    if !(wilks::MIN_BODY_WEIGHT_KG..=wilks::MAX_BODY_WEIGHT_KG).contains(&body_weight_kg) {
        return Err(AppError::invalid_input(format!(
            "body weight must be between {} and {} kg",
            wilks::MIN_BODY_WEIGHT_KG,
            wilks::MAX_BODY_WEIGHT_KG
        )));
    }
    if lifted_kg < 0.0 {
        return Err(AppError::invalid_input("lifted weight must be non-negative"));
    }

    let coefficients = match gender {
        Gender::Male => &wilks::MALE_COEFFICIENTS,
        Gender::Female => &wilks::FEMALE_COEFFICIENTS,
    };

    let x = body_weight_kg;
    let denominator = coefficients
        .iter()
        .enumerate()
        .map(|(power, coef)| coef * x.powi(power as i32))
        .sum::<f64>();

    Ok(round_to_2dp(lifted_kg * wilks::SCALE / denominator))
}

/// Calculate Basal Metabolic Rate using the Mifflin-St Jeor equation:
/// `BMR = 10*weight + 6.25*height - 5*age + 5` (male) / `- 161` (female).
///
/// # Errors
///
/// Returns `InvalidInput` when inputs are out of the validated ranges.
pub fn calculate_bmr(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: Gender,
    config: &BmrConfig,
) -> AppResult<f64> {
    if weight_kg <= 0.0 || weight_kg > 300.0 {
        return Err(AppError::invalid_input(
            "weight must be between 0 and 300 kg",
        ));
    }
    if height_cm <= 0.0 || height_cm > 300.0 {
        return Err(AppError::invalid_input(
            "height must be between 0 and 300 cm",
        ));
    }
    if !(10..=120).contains(&age) {
        return Err(AppError::invalid_input(
            "age must be between 10 and 120 years",
        ));
    }

    let gender_constant = match gender {
        Gender::Male => config.male_constant,
        Gender::Female => config.female_constant,
    };

    Ok(config.weight_coef * weight_kg
        + config.height_coef * height_cm
        + config.age_coef * f64::from(age)
        + gender_constant)
}

/// Total Daily Energy Expenditure: `TDEE = BMR * activity factor`.
///
/// # Errors
///
/// Returns `InvalidInput` when BMR is not positive.
pub fn calculate_tdee(
    bmr: f64,
    activity_level: ActivityLevel,
    config: &ActivityFactorsConfig,
) -> AppResult<f64> {
    if bmr <= 0.0 {
        return Err(AppError::invalid_input("BMR must be positive"));
    }

    let activity_factor = match activity_level {
        ActivityLevel::Sedentary => config.sedentary,
        ActivityLevel::LightlyActive => config.lightly_active,
        ActivityLevel::ModeratelyActive => config.moderately_active,
        ActivityLevel::VeryActive => config.very_active,
        ActivityLevel::ExtraActive => config.extra_active,
    };

    Ok(bmr * activity_factor)
}

/// User parameters for the daily macro target calculation
#[derive(Debug, Clone, Copy)]
pub struct MacroParams {
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Height in centimeters
    pub height_cm: f64,
    /// Age in years
    pub age: u32,
    /// Biological gender for BMR
    pub gender: Gender,
    /// Activity level for the TDEE multiplier
    pub activity_level: ActivityLevel,
    /// Training goal for the calorie adjustment
    pub training_goal: TrainingGoal,
}

/// Complete daily macro target calculation result.
/// Calories and grams are rounded to whole units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroTargets {
    /// Basal Metabolic Rate in kcal/day (unrounded intermediate)
    pub bmr_kcal: f64,
    /// Total Daily Energy Expenditure in kcal/day
    pub tdee_kcal: u32,
    /// Goal-adjusted calorie target in kcal/day
    pub target_calories_kcal: u32,
    /// Daily protein target in grams
    pub protein_g: u32,
    /// Daily fat target in grams
    pub fat_g: u32,
    /// Daily carbohydrate target in grams
    pub carbs_g: u32,
}

/// Calculate daily calorie and macro targets: Mifflin-St Jeor BMR, an
/// activity-factor TDEE, a goal adjustment (cut -20% / bulk +10% /
/// maintain), then a fixed g/kg protein target, percentage-based fat,
/// and carbohydrates from the calorie remainder.
///
/// # Errors
///
/// Returns `InvalidInput` when any biometric input fails validation.
pub fn daily_macro_targets(
    params: &MacroParams,
    bmr_config: &BmrConfig,
    activity_config: &ActivityFactorsConfig,
    split_config: &MacroSplitConfig,
) -> AppResult<MacroTargets> {
    let bmr = calculate_bmr(
        params.weight_kg,
        params.height_cm,
        params.age,
        params.gender,
        bmr_config,
    )?;
    let tdee = calculate_tdee(bmr, params.activity_level, activity_config)?;

    let goal_multiplier = match params.training_goal {
        TrainingGoal::Cut => split_config.cut_multiplier,
        TrainingGoal::Maintain => split_config.maintain_multiplier,
        TrainingGoal::Bulk => split_config.bulk_multiplier,
    };
    let target_calories = tdee * goal_multiplier;

    let protein_g = params.weight_kg * split_config.protein_g_per_kg;
    let protein_kcal = protein_g * macros::PROTEIN_KCAL_PER_G;

    let fat_kcal = target_calories * split_config.fat_percent_of_calories;
    let fat_g = fat_kcal / macros::FAT_KCAL_PER_G;

    let carbs_kcal = (target_calories - protein_kcal - fat_kcal).max(0.0);
    let carbs_g = carbs_kcal / macros::CARBS_KCAL_PER_G;

    Ok(MacroTargets {
        bmr_kcal: bmr,
        tdee_kcal: tdee.round() as u32,
        target_calories_kcal: target_calories.round() as u32,
        protein_g: protein_g.round() as u32,
        fat_g: fat_g.round() as u32,
        carbs_g: carbs_g.round() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_epley_one_rep_max() {
        let one_rm = estimated_one_rep_max(100.0, 5).unwrap();
        assert!((one_rm - 116.67).abs() < f64::EPSILON);

        let one_rm = estimated_one_rep_max(90.0, 10).unwrap();
        assert!((one_rm - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_epley_zero_reps_is_undefined() {
        assert!(estimated_one_rep_max(100.0, 0).is_none());
    }

    #[test]
    fn test_set_volume_missing_component_is_zero() {
        assert!((set_volume(Some(100.0), Some(5)) - 500.0).abs() < f64::EPSILON);
        assert!(set_volume(None, Some(5)).abs() < f64::EPSILON);
        assert!(set_volume(Some(100.0), None).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wilks_score_male_reference_value() {
        let score = wilks_score(Gender::Male, 80.0, 400.0).unwrap();
        assert!((score - 273.08).abs() < 0.01, "got {score}");
    }

    #[test]
    fn test_wilks_score_gender_tables_differ() {
        let male = wilks_score(Gender::Male, 60.0, 300.0).unwrap();
        let female = wilks_score(Gender::Female, 60.0, 300.0).unwrap();
        assert!(female > male);
    }

    #[test]
    fn test_wilks_rejects_out_of_range_body_weight() {
        assert!(wilks_score(Gender::Male, 10.0, 100.0).is_err());
        assert!(wilks_score(Gender::Male, 80.0, -1.0).is_err());
    }

    #[test]
    fn test_bmr_mifflin_st_jeor() {
        let config = EngineConfig::default();
        // 10*80 + 6.25*180 - 5*30 + 5 = 800 + 1125 - 150 + 5 = 1780
        let bmr = calculate_bmr(80.0, 180.0, 30, Gender::Male, &config.bmr).unwrap();
        assert!((bmr - 1780.0).abs() < f64::EPSILON);

        // Female constant: -161 instead of +5
        let bmr = calculate_bmr(80.0, 180.0, 30, Gender::Female, &config.bmr).unwrap();
        assert!((bmr - 1614.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_macro_targets_cut_adjustment_and_remainder_carbs() {
        let config = EngineConfig::default();
        let params = MacroParams {
            weight_kg: 80.0,
            height_cm: 180.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::ModeratelyActive,
            training_goal: TrainingGoal::Cut,
        };
        let targets = daily_macro_targets(
            &params,
            &config.bmr,
            &config.activity_factors,
            &config.macro_split,
        )
        .unwrap();

        // BMR 1780, TDEE 1780*1.55 = 2759, cut -20% => 2207.2 -> 2207
        assert_eq!(targets.tdee_kcal, 2759);
        assert_eq!(targets.target_calories_kcal, 2207);
        // Protein 80kg * 2.0 g/kg
        assert_eq!(targets.protein_g, 160);
        // Fat: 2207.2 * 0.25 / 9 = 61.31 -> 61
        assert_eq!(targets.fat_g, 61);
        // Carbs fill the remainder: (2207.2 - 640 - 551.8) / 4 = 253.85 -> 254
        assert_eq!(targets.carbs_g, 254);
    }

    #[test]
    fn test_macro_targets_reject_invalid_biometrics() {
        let config = EngineConfig::default();
        let params = MacroParams {
            weight_kg: -5.0,
            height_cm: 180.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Sedentary,
            training_goal: TrainingGoal::Maintain,
        };
        assert!(daily_macro_targets(
            &params,
            &config.bmr,
            &config.activity_factors,
            &config.macro_split,
        )
        .is_err());
    }
}
