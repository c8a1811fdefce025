//! Audit logging for plan and quota events.
//!
//! Trait-based so embedders can route events to their own sink (database,
//! external service, log pipeline). Resolution degradations are reported
//! here rather than surfaced to callers.

use std::fmt;

use async_trait::async_trait;

use crate::catalog::PlanKey;
use crate::quota::Resource;

/// Audit event types for entitlement operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAuditEvent {
    /// A plan change was persisted.
    PlanChanged {
        user_id: String,
        from: PlanKey,
        to: PlanKey,
    },
    /// A plan change was rejected before reaching the store.
    PlanChangeRejected {
        user_id: String,
        requested: PlanKey,
        reason: String,
    },
    /// Plan resolution fell back to the free plan.
    ResolutionDegraded { user_id: String, reason: String },
    /// A resource creation was denied by a plan limit.
    QuotaDenied {
        user_id: String,
        resource: Resource,
        limit: u32,
        plan: PlanKey,
    },
    /// An agency inquiry was accepted by the contact channel.
    InquirySubmitted { inquiry_id: String, email: String },
}

impl fmt::Display for PlanAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanChanged { user_id, from, to } => {
                write!(f, "Plan changed: user={}, from={}, to={}", user_id, from, to)
            }
            Self::PlanChangeRejected {
                user_id,
                requested,
                reason,
            } => {
                write!(
                    f,
                    "Plan change rejected: user={}, requested={}, reason={}",
                    user_id, requested, reason
                )
            }
            Self::ResolutionDegraded { user_id, reason } => {
                write!(
                    f,
                    "Resolution degraded to free: user={}, reason={}",
                    user_id, reason
                )
            }
            Self::QuotaDenied {
                user_id,
                resource,
                limit,
                plan,
            } => {
                write!(
                    f,
                    "Quota denied: user={}, resource={}, limit={}, plan={}",
                    user_id, resource, limit, plan
                )
            }
            Self::InquirySubmitted { inquiry_id, email } => {
                write!(f, "Inquiry submitted: id={}, email={}", inquiry_id, email)
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implementations should handle failures internally so a broken audit sink
/// never disrupts entitlement decisions.
#[async_trait]
pub trait PlanAuditLogger: Send + Sync {
    /// Record an audit event.
    async fn record(&self, event: PlanAuditEvent);
}

/// No-op audit logger that discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

#[async_trait]
impl PlanAuditLogger for NoOpAuditLogger {
    async fn record(&self, _event: PlanAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Degradations log at WARN; everything else at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

#[async_trait]
impl PlanAuditLogger for TracingAuditLogger {
    async fn record(&self, event: PlanAuditEvent) {
        match &event {
            PlanAuditEvent::ResolutionDegraded { .. } => {
                tracing::warn!(
                    target: "reviewflow::audit",
                    event_type = %event_kind(&event),
                    "{}", event
                );
            }
            _ => {
                tracing::info!(
                    target: "reviewflow::audit",
                    event_type = %event_kind(&event),
                    "{}", event
                );
            }
        }
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &PlanAuditEvent) -> &'static str {
    match event {
        PlanAuditEvent::PlanChanged { .. } => "plan_changed",
        PlanAuditEvent::PlanChangeRejected { .. } => "plan_change_rejected",
        PlanAuditEvent::ResolutionDegraded { .. } => "resolution_degraded",
        PlanAuditEvent::QuotaDenied { .. } => "quota_denied",
        PlanAuditEvent::InquirySubmitted { .. } => "inquiry_submitted",
    }
}

/// Audit logger that captures events, for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Captures every recorded event in memory.
    #[derive(Default, Clone)]
    pub struct RecordingAuditLogger {
        events: Arc<Mutex<Vec<PlanAuditEvent>>>,
    }

    impl RecordingAuditLogger {
        /// Create a new recording logger.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All events recorded so far.
        #[must_use]
        pub fn events(&self) -> Vec<PlanAuditEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlanAuditLogger for RecordingAuditLogger {
        async fn record(&self, event: PlanAuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
