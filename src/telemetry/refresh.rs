use std::time::Duration;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::RefreshFailure;

/// Structured events for one refresh cycle, all tagged with the same id.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    cycle_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            context = %self.context,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, elapsed: Duration, waiters: usize) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            context = %self.context,
            elapsed_ms = elapsed.as_millis() as u64,
            waiters,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, failure: &RefreshFailure, elapsed: Duration, waiters: usize) {
        let kind = match failure {
            RefreshFailure::Network(_) => "network",
            RefreshFailure::Rejected { .. } => "rejected",
            RefreshFailure::Malformed(_) => "malformed",
            RefreshFailure::Aborted => "aborted",
        };
        event!(
            Level::ERROR,
            cycle_id = %self.cycle_id,
            context = %self.context,
            elapsed_ms = elapsed.as_millis() as u64,
            waiters,
            kind,
            error = %failure,
            "refresh.failure"
        );
    }

    pub fn emit_waiter_enqueued(&self, ticket: u64, position: usize) {
        event!(
            Level::DEBUG,
            cycle_id = %self.cycle_id,
            ticket,
            position,
            "refresh.waiter.enqueued"
        );
    }

    pub fn emit_waiter_resumed(&self, ticket: u64, success: bool) {
        event!(
            Level::INFO,
            cycle_id = %self.cycle_id,
            ticket,
            success,
            "refresh.waiter.resumed"
        );
    }
}
