// ABOUTME: Notification decisions emitted by the engine when milestones are crossed
// ABOUTME: Delivery transport is an external collaborator behind the NotificationSink trait
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Ironlog

//! The engine decides *whether* to notify; it never delivers. Hosts plug
//! a transport (push, email, SSE) in behind [`NotificationSink`].
//! Failures in the sink are logged and never propagate into the
//! triggering mutation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppResult;

/// Notification categories the engine can decide to emit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A personal record was raised
    PersonalRecord,
    /// An achievement was unlocked for the first time
    AchievementUnlocked,
    /// A goal reached its target
    GoalCompleted,
}

/// A dispatch decision handed to the transport layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDecision {
    /// Recipient
    pub user_id: Uuid,
    /// Category
    pub kind: NotificationKind,
    /// Short human-readable summary
    pub message: String,
    /// Structured payload for rich clients
    pub payload: serde_json::Value,
    /// When the decision was made
    pub decided_at: DateTime<Utc>,
}

/// Transport boundary. Implementations deliver; the engine only calls
/// `dispatch` after the owning preference check passed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Hand a decision to the transport
    ///
    /// # Errors
    ///
    /// Returns an error when delivery queueing fails; callers log and
    /// continue.
    async fn dispatch(&self, decision: NotificationDecision) -> AppResult<()>;
}

/// Sink that drops every decision; the default when a host wires no
/// transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn dispatch(&self, decision: NotificationDecision) -> AppResult<()> {
        tracing::debug!(
            user_id = %decision.user_id,
            kind = ?decision.kind,
            "notification decision dropped (no sink configured)"
        );
        Ok(())
    }
}

/// Sink that records decisions in memory, for tests and auditing
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    decisions: Arc<Mutex<Vec<NotificationDecision>>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every decision dispatched so far
    pub async fn decisions(&self) -> Vec<NotificationDecision> {
        self.decisions.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn dispatch(&self, decision: NotificationDecision) -> AppResult<()> {
        self.decisions.lock().await.push(decision);
        Ok(())
    }
}
