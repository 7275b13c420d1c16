//! Session Context
//!
//! Per-session state that would otherwise live in globals: identity, start
//! time, and usage counters. Created with [`SessionContext::start`], passed
//! down explicitly, and consumed by [`SessionContext::end`].

mod metrics;

pub use metrics::UsageMetrics;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    usage: UsageMetrics,
}

/// Final report for an ended session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub usage: UsageMetrics,
}

impl SessionContext {
    pub fn start() -> Self {
        let context = Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            usage: UsageMetrics::default(),
        };
        tracing::info!(session_id = %context.session_id, "Session started");
        context
    }

    pub fn end(self) -> SessionSummary {
        let ended_at = Utc::now();
        let duration_ms = (ended_at - self.started_at).num_milliseconds();
        tracing::info!(
            session_id = %self.session_id,
            duration_ms,
            elements = self.usage.total_elements(),
            "Session ended"
        );
        SessionSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            ended_at,
            duration_ms,
            usage: self.usage,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn usage(&self) -> &UsageMetrics {
        &self.usage
    }

    pub fn usage_mut(&mut self) -> &mut UsageMetrics {
        &mut self.usage
    }
}
