// ABOUTME: System-wide constants for the derived-metrics engine
// ABOUTME: Formula coefficients, activity factors, cache TTLs, and achievement thresholds
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! Engine constants grouped by concern. Formula coefficients carry their
//! source equations; everything else is a tunable default surfaced through
//! the `config` module.

/// One-rep-max estimation (Epley 1985)
pub mod one_rep_max {
    /// Epley divisor: `1rm = weight * (1 + reps / 30)`
    pub const EPLEY_REPS_DIVISOR: f64 = 30.0;
}

/// Wilks coefficient polynomial (Wilks 1994), per-gender tables.
///
/// `score = lifted * 500 / (a + b*x + c*x^2 + d*x^3 + e*x^4 + f*x^5)`
/// where `x` is body weight in kilograms.
pub mod wilks {
    /// Male coefficients a..f
    pub const MALE_COEFFICIENTS: [f64; 6] = [
        -216.047_514_4,
        16.260_633_9,
        -0.002_388_645,
        -0.001_137_32,
        7.018_63e-6,
        -1.291e-8,
    ];

    /// Female coefficients a..f
    pub const FEMALE_COEFFICIENTS: [f64; 6] = [
        594.317_477_755_82,
        -27.238_425_364_47,
        0.821_122_268_71,
        -0.009_307_339_13,
        4.731_582e-5,
        -9.054e-8,
    ];

    /// Numerator constant in the Wilks formula
    pub const SCALE: f64 = 500.0;

    /// Body weight bounds (kg) the coefficient tables are validated for
    pub const MIN_BODY_WEIGHT_KG: f64 = 30.0;
    /// Upper body weight bound (kg)
    pub const MAX_BODY_WEIGHT_KG: f64 = 250.0;
}

/// Mifflin-St Jeor BMR equation (1990) coefficients
pub mod bmr {
    /// Weight coefficient (kcal per kg)
    pub const WEIGHT_COEF: f64 = 10.0;
    /// Height coefficient (kcal per cm)
    pub const HEIGHT_COEF: f64 = 6.25;
    /// Age coefficient (kcal per year, subtractive)
    pub const AGE_COEF: f64 = -5.0;
    /// Additive constant for males
    pub const MALE_CONSTANT: f64 = 5.0;
    /// Additive constant for females
    pub const FEMALE_CONSTANT: f64 = -161.0;
}

/// TDEE activity multipliers (McArdle et al. 2010)
pub mod activity_factors {
    /// Little or no exercise
    pub const SEDENTARY: f64 = 1.2;
    /// Training 1-3 days/week
    pub const LIGHTLY_ACTIVE: f64 = 1.375;
    /// Training 3-5 days/week
    pub const MODERATELY_ACTIVE: f64 = 1.55;
    /// Training 6-7 days/week
    pub const VERY_ACTIVE: f64 = 1.725;
    /// Hard training twice a day
    pub const EXTRA_ACTIVE: f64 = 1.9;
}

/// Calorie adjustments and macro split defaults
pub mod macros {
    /// Cutting adjustment applied to TDEE
    pub const CUT_MULTIPLIER: f64 = 0.8;
    /// Bulking adjustment applied to TDEE
    pub const BULK_MULTIPLIER: f64 = 1.1;
    /// Maintenance adjustment applied to TDEE
    pub const MAINTAIN_MULTIPLIER: f64 = 1.0;

    /// Fixed protein target in grams per kg body weight
    pub const PROTEIN_G_PER_KG: f64 = 2.0;
    /// Fat allocation as a fraction of target calories
    pub const FAT_PERCENT_OF_CALORIES: f64 = 0.25;

    /// Energy density of protein (kcal/g)
    pub const PROTEIN_KCAL_PER_G: f64 = 4.0;
    /// Energy density of carbohydrate (kcal/g)
    pub const CARBS_KCAL_PER_G: f64 = 4.0;
    /// Energy density of fat (kcal/g)
    pub const FAT_KCAL_PER_G: f64 = 9.0;
}

/// Streak tracking defaults
pub mod streaks {
    /// Days of inactivity after which the displayed streak reads zero
    pub const EFFECTIVE_STREAK_GRACE_DAYS: i64 = 1;
}

/// Stats cache defaults
pub mod cache {
    /// Maximum entries held by the in-memory stats cache
    pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
    /// Background cleanup cadence in seconds
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;
    /// Volume trend TTL in seconds (1 hour)
    pub const TTL_VOLUME_TREND_SECS: u64 = 3_600;
    /// Muscle distribution TTL in seconds (1 hour)
    pub const TTL_MUSCLE_DISTRIBUTION_SECS: u64 = 3_600;
    /// Duration distribution TTL in seconds (6 hours)
    pub const TTL_DURATION_DISTRIBUTION_SECS: u64 = 21_600;
    /// Duration history TTL in seconds (15 minutes)
    pub const TTL_DURATION_HISTORY_SECS: u64 = 900;
}

/// Achievement catalog thresholds
pub mod achievements {
    /// Streak milestones (consecutive days) that unlock achievements
    pub const STREAK_MILESTONE_DAYS: [u32; 4] = [7, 30, 100, 365];
    /// Cumulative volume milestones in kg
    pub const VOLUME_MILESTONES_KG: [f64; 3] = [10_000.0, 100_000.0, 1_000_000.0];
}

/// Duration distribution histogram bucket upper bounds, in minutes.
/// The final bucket is open-ended.
pub const DURATION_BUCKET_UPPER_BOUNDS_MIN: [i64; 4] = [30, 45, 60, 90];
