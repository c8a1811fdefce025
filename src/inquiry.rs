//! Agency & white-label inquiries.
//!
//! The agency tier is not self-service: selecting it routes to a
//! human-contact workflow instead of a plan change. [`AgencyContact`]
//! validates the payload, hands it to the configured [`InquiryChannel`],
//! and audits the submission. Nothing downstream depends on the outcome
//! beyond showing the confirmation to the user.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{NoOpAuditLogger, PlanAuditEvent, PlanAuditLogger};
use crate::error::Result;
use crate::validation::validate_inquiry;

/// Confirmation copy returned with every accepted inquiry.
pub const INQUIRY_CONFIRMATION: &str =
    "Thank you for your interest. Our team will contact you shortly.";

/// An agency inquiry payload, as collected by the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyInquiry {
    /// Full name of the person inquiring.
    pub name: String,
    /// Email address to reach them at.
    pub email: String,
    /// Company name, if provided.
    pub company: Option<String>,
    /// Free-form description of their needs.
    pub message: String,
}

/// Receipt for an accepted inquiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryReceipt {
    /// Identifier assigned to the inquiry, for follow-up correlation.
    pub inquiry_id: Uuid,
    /// Confirmation copy to show the user.
    pub confirmation: String,
}

impl InquiryReceipt {
    /// Create a receipt with a fresh id and the standard confirmation copy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inquiry_id: Uuid::new_v4(),
            confirmation: INQUIRY_CONFIRMATION.to_string(),
        }
    }
}

impl Default for InquiryReceipt {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for the human-contact channel accepting agency inquiries.
///
/// Implement this against your outbound email service or CRM.
#[async_trait]
pub trait InquiryChannel: Send + Sync {
    /// Deliver an inquiry. The payload has already been validated.
    async fn submit(&self, inquiry: &AgencyInquiry) -> Result<InquiryReceipt>;
}

/// Front door for agency inquiries: validation, delivery, auditing.
pub struct AgencyContact<C> {
    channel: C,
    audit: Arc<dyn PlanAuditLogger>,
}

impl<C: InquiryChannel> AgencyContact<C> {
    /// Create a contact front door over a delivery channel.
    #[must_use]
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            audit: Arc::new(NoOpAuditLogger),
        }
    }

    /// Attach an audit logger for accepted inquiries.
    #[must_use]
    pub fn with_audit_logger(mut self, audit: Arc<dyn PlanAuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Validate and submit an inquiry.
    ///
    /// Validation failures and channel failures are both surfaced to the
    /// caller; only an accepted inquiry produces a receipt.
    pub async fn submit(&self, inquiry: AgencyInquiry) -> Result<InquiryReceipt> {
        validate_inquiry(&inquiry)?;

        let receipt = self.channel.submit(&inquiry).await?;

        tracing::info!(
            target: "reviewflow::inquiry",
            inquiry_id = %receipt.inquiry_id,
            email = %inquiry.email,
            "agency inquiry submitted"
        );
        self.audit
            .record(PlanAuditEvent::InquirySubmitted {
                inquiry_id: receipt.inquiry_id.to_string(),
                email: inquiry.email.clone(),
            })
            .await;

        Ok(receipt)
    }
}

/// Recording channel for testing.
#[cfg(any(test, feature = "test-support"))]
pub mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Channel that records every delivered inquiry in memory.
    #[derive(Default, Clone)]
    pub struct RecordingInquiryChannel {
        inquiries: Arc<Mutex<Vec<AgencyInquiry>>>,
    }

    impl RecordingInquiryChannel {
        /// Create a new recording channel.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All inquiries delivered so far.
        #[must_use]
        pub fn inquiries(&self) -> Vec<AgencyInquiry> {
            self.inquiries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InquiryChannel for RecordingInquiryChannel {
        async fn submit(&self, inquiry: &AgencyInquiry) -> Result<InquiryReceipt> {
            self.inquiries.lock().unwrap().push(inquiry.clone());
            Ok(InquiryReceipt::new())
        }
    }

    /// Channel whose every delivery fails.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FailingInquiryChannel;

    #[async_trait]
    impl InquiryChannel for FailingInquiryChannel {
        async fn submit(&self, _inquiry: &AgencyInquiry) -> Result<InquiryReceipt> {
            Err(anyhow::anyhow!("contact channel unavailable").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test::{FailingInquiryChannel, RecordingInquiryChannel};
    use super::*;
    use crate::audit::test::RecordingAuditLogger;
    use crate::error::Error;

    fn inquiry() -> AgencyInquiry {
        AgencyInquiry {
            name: "Priya Shah".to_string(),
            email: "priya@agencyhouse.example".to_string(),
            company: Some("Agency House".to_string()),
            message: "Looking for white-label review funnels for our clients.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_delivers_and_returns_receipt() {
        let channel = RecordingInquiryChannel::new();
        let contact = AgencyContact::new(channel.clone());

        let receipt = contact.submit(inquiry()).await.unwrap();
        assert_eq!(receipt.confirmation, INQUIRY_CONFIRMATION);

        let delivered = channel.inquiries();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].email, "priya@agencyhouse.example");
    }

    #[tokio::test]
    async fn test_submit_audits_acceptance() {
        let audit = RecordingAuditLogger::new();
        let contact = AgencyContact::new(RecordingInquiryChannel::new())
            .with_audit_logger(Arc::new(audit.clone()));

        let receipt = contact.submit(inquiry()).await.unwrap();

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            PlanAuditEvent::InquirySubmitted { inquiry_id, .. }
                if *inquiry_id == receipt.inquiry_id.to_string()
        ));
    }

    #[tokio::test]
    async fn test_invalid_payload_never_reaches_channel() {
        let channel = RecordingInquiryChannel::new();
        let contact = AgencyContact::new(channel.clone());

        let mut bad = inquiry();
        bad.email = "not-an-email".to_string();

        let err = contact.submit(bad).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInquiry { .. }));
        assert!(channel.inquiries().is_empty());
    }

    #[tokio::test]
    async fn test_channel_failure_is_surfaced() {
        let contact = AgencyContact::new(FailingInquiryChannel);

        let err = contact.submit(inquiry()).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_receipts_get_unique_ids() {
        let a = InquiryReceipt::new();
        let b = InquiryReceipt::new();
        assert_ne!(a.inquiry_id, b.inquiry_id);
    }
}
