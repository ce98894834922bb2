// ABOUTME: Main library entry point for the Ironlog derived-metrics engine
// ABOUTME: Recomputes records, streaks, goals, volume and cached stats from mutation events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ironlog

#![deny(unsafe_code)]

//! # Ironlog Derived-Metrics Engine
//!
//! The recomputation core of the Ironlog fitness tracker. The CRUD layer
//! persists raw records (sets, workouts, measurements, habit logs) and
//! then hands the engine a mutation event; the engine deterministically
//! recomputes every dependent aggregate — personal records, streaks,
//! goal progress, volume totals, cached statistics — while holding the
//! correctness invariants the rest of the product relies on:
//!
//! - **Monotonicity**: a record value never goes down except by
//!   recompute-from-history after its source set is deleted or lowered
//! - **Idempotence**: replaying an unchanged event writes nothing new
//! - **No stale reads**: cache invalidation completes before the
//!   triggering event returns
//! - **No double counting**: same-day workouts advance a streak once;
//!   volume totals are rebuilt from raw history, never delta-patched
//!
//! ## Architecture
//!
//! - **`engine`**: the event entry points and the explicit dispatch chain
//! - **`formulas`**: pure metric math (Epley, Wilks, Mifflin-St Jeor)
//! - **`records` / `streaks` / `goals` / `volume` / `achievements`**:
//!   one subscriber per derived aggregate
//! - **`stats` + `cache`**: cache-backed read-side aggregates with
//!   selective invalidation
//! - **`store`**: the trait boundary over the external persistence layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ironlog_engine::cache::{CacheConfig, CacheProvider};
//! use ironlog_engine::cache::memory::InMemoryCache;
//! use ironlog_engine::config::EngineConfig;
//! use ironlog_engine::engine::MetricsEngine;
//! use ironlog_engine::errors::AppResult;
//! use ironlog_engine::notifications::NullSink;
//! use ironlog_engine::store::memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let store = InMemoryStore::new();
//!     let cache = InMemoryCache::new(CacheConfig::default()).await?;
//!     let config = EngineConfig::from_env()?;
//!     let engine = MetricsEngine::new(store, cache, &config, Arc::new(NullSink));
//!
//!     // The CRUD layer persists a set, then notifies the engine:
//!     // engine.on_set_saved(&set).await?;
//!     Ok(())
//! }
//! ```

/// Achievement evaluation with idempotent unlocks
pub mod achievements;

/// Cache abstraction layer with pluggable backends
pub mod cache;

/// Engine configuration with environment overrides
pub mod config;

/// Formula coefficients and tunable defaults
pub mod constants;

/// Event-driven orchestrator and repair entry points
pub mod engine;

/// Unified error handling system with standard error codes
pub mod errors;

/// Pure metric formulas (1RM, volume, Wilks, BMR/TDEE/macros)
pub mod formulas;

/// Goal progress tracking with direction-aware completion
pub mod goals;

/// Structured logging setup
pub mod logging;

/// Domain records and closed enums
pub mod models;

/// Notification decisions and the transport boundary
pub mod notifications;

/// Personal record synchronization
pub mod records;

/// Cache-backed statistics and selective invalidation
pub mod stats;

/// Entity store abstraction over the external persistence layer
pub mod store;

/// Consecutive-day streak tracking for workouts and habits
pub mod streaks;

/// Denormalized volume aggregation
pub mod volume;
