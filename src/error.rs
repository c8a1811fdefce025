//! Error types for entitlement operations.
//!
//! Resolution never produces an error: it degrades to the free plan and the
//! degradation is logged (see [`crate::resolver`]). The variants here cover
//! plan mutations, input validation, and store failures, which are surfaced
//! to the immediate caller.

use crate::catalog::PlanKey;

/// The main error type for entitlement operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Attempted transition from a paid plan back to the free plan.
    #[error("Downgrading to the Free plan is not permitted.")]
    DowngradeNotPermitted {
        /// The paid plan the user is currently on.
        from: PlanKey,
    },

    /// Attempted paid-to-paid downgrade while the resolver is configured to
    /// deny them.
    #[error("Downgrading from the {from} plan to the {to} plan is not permitted.")]
    PaidDowngradeDenied { from: PlanKey, to: PlanKey },

    /// The agency tier is arranged through the sales team, never through a
    /// self-service plan change.
    #[error("The Agency plan is arranged through our sales team. Please submit an inquiry.")]
    SalesContactRequired,

    /// The user id failed validation.
    #[error("Invalid user id '{id}': {reason}")]
    InvalidUserId { id: String, reason: String },

    /// A raw plan key failed validation before persisting.
    #[error("Invalid plan key '{key}': {reason}")]
    InvalidPlanKey { key: String, reason: String },

    /// An agency inquiry payload failed validation.
    #[error("Invalid inquiry field '{field}': {reason}")]
    InvalidInquiry { field: String, reason: String },

    /// The external store rejected an operation. Surfaced verbatim so the
    /// caller can offer a retry.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error was caused by the caller's input or by a
    /// disallowed transition, as opposed to an infrastructure failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    /// Check if retrying the same operation could succeed.
    ///
    /// Only store failures are retryable; rejected transitions and
    /// validation failures are deterministic.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result type alias for entitlement operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downgrade_message_matches_ui_copy() {
        let err = Error::DowngradeNotPermitted {
            from: PlanKey::Business,
        };
        assert_eq!(
            err.to_string(),
            "Downgrading to the Free plan is not permitted."
        );
    }

    #[test]
    fn test_paid_downgrade_message_names_both_plans() {
        let err = Error::PaidDowngradeDenied {
            from: PlanKey::Business,
            to: PlanKey::Starter,
        };
        assert_eq!(
            err.to_string(),
            "Downgrading from the business plan to the starter plan is not permitted."
        );
    }

    #[test]
    fn test_classification() {
        let err = Error::DowngradeNotPermitted {
            from: PlanKey::Starter,
        };
        assert!(err.is_client_error());
        assert!(!err.is_retryable());

        let err = Error::InvalidUserId {
            id: "".to_string(),
            reason: "empty".to_string(),
        };
        assert!(err.is_client_error());
        assert!(!err.is_retryable());

        let err = Error::Store(anyhow::anyhow!("connection refused"));
        assert!(!err.is_client_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_error_surfaced_verbatim() {
        let err = Error::Store(anyhow::anyhow!("profiles table unavailable"));
        assert_eq!(err.to_string(), "profiles table unavailable");
    }
}
