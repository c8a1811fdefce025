//! Input validation for entitlement operations.
//!
//! Validates user ids, stored plan keys, and inquiry payloads before they
//! reach the external store, to prevent injection into logs or queries and
//! to keep garbage out of persisted data.

use crate::error::{Error, Result};
use crate::inquiry::AgencyInquiry;

/// Maximum length for user ids.
const MAX_USER_ID_LENGTH: usize = 256;

/// Maximum length for stored plan keys.
const MAX_PLAN_KEY_LENGTH: usize = 64;

/// Maximum length for inquiry names and company names.
const MAX_INQUIRY_NAME_LENGTH: usize = 128;

/// Maximum length for inquiry email addresses (RFC 5321 limit).
const MAX_INQUIRY_EMAIL_LENGTH: usize = 254;

/// Maximum length for inquiry messages.
const MAX_INQUIRY_MESSAGE_LENGTH: usize = 4000;

/// Validate a user id.
///
/// User ids must be non-empty, at most 256 characters, and contain only
/// alphanumeric characters, underscores, and hyphens (which covers UUIDs).
///
/// # Errors
///
/// Returns [`Error::InvalidUserId`] if validation fails.
pub fn validate_user_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidUserId {
            id: id.to_string(),
            reason: "user id cannot be empty".to_string(),
        });
    }

    if id.len() > MAX_USER_ID_LENGTH {
        return Err(Error::InvalidUserId {
            id: truncate_for_error(id),
            reason: format!("user id exceeds maximum length of {}", MAX_USER_ID_LENGTH),
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidUserId {
            id: sanitize_for_error(id),
            reason: "user id contains invalid characters (only alphanumeric, underscore, and hyphen allowed)"
                .to_string(),
        });
    }

    Ok(())
}

/// Validate a raw plan key before persisting it.
///
/// This guards what goes *into* the store; reading tolerates anything and
/// falls back to the free plan.
///
/// # Errors
///
/// Returns [`Error::InvalidPlanKey`] if validation fails.
pub fn validate_plan_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidPlanKey {
            key: key.to_string(),
            reason: "plan key cannot be empty".to_string(),
        });
    }

    if key.len() > MAX_PLAN_KEY_LENGTH {
        return Err(Error::InvalidPlanKey {
            key: truncate_for_error(key),
            reason: format!("plan key exceeds maximum length of {}", MAX_PLAN_KEY_LENGTH),
        });
    }

    if !key.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
        return Err(Error::InvalidPlanKey {
            key: sanitize_for_error(key),
            reason: "plan key contains invalid characters (only lowercase letters and underscore allowed)"
                .to_string(),
        });
    }

    Ok(())
}

/// Validate an agency inquiry payload.
///
/// # Errors
///
/// Returns [`Error::InvalidInquiry`] naming the first offending field.
pub fn validate_inquiry(inquiry: &AgencyInquiry) -> Result<()> {
    if inquiry.name.trim().is_empty() {
        return Err(invalid_field("name", "name cannot be empty"));
    }
    if inquiry.name.len() > MAX_INQUIRY_NAME_LENGTH {
        return Err(invalid_field(
            "name",
            &format!("name exceeds maximum length of {}", MAX_INQUIRY_NAME_LENGTH),
        ));
    }

    validate_inquiry_email(&inquiry.email)?;

    if let Some(company) = &inquiry.company {
        if company.len() > MAX_INQUIRY_NAME_LENGTH {
            return Err(invalid_field(
                "company",
                &format!(
                    "company exceeds maximum length of {}",
                    MAX_INQUIRY_NAME_LENGTH
                ),
            ));
        }
    }

    if inquiry.message.trim().is_empty() {
        return Err(invalid_field("message", "message cannot be empty"));
    }
    if inquiry.message.len() > MAX_INQUIRY_MESSAGE_LENGTH {
        return Err(invalid_field(
            "message",
            &format!(
                "message exceeds maximum length of {}",
                MAX_INQUIRY_MESSAGE_LENGTH
            ),
        ));
    }

    Ok(())
}

fn validate_inquiry_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(invalid_field("email", "email cannot be empty"));
    }
    if email.len() > MAX_INQUIRY_EMAIL_LENGTH {
        return Err(invalid_field(
            "email",
            &format!(
                "email exceeds maximum length of {}",
                MAX_INQUIRY_EMAIL_LENGTH
            ),
        ));
    }

    // Shape check only; deliverability is the contact channel's problem.
    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid_field("email", "email must contain '@'"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(char::is_whitespace) {
        return Err(invalid_field("email", "email is not a plausible address"));
    }

    Ok(())
}

fn invalid_field(field: &str, reason: &str) -> Error {
    Error::InvalidInquiry {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Truncate a string for error messages to prevent log flooding.
fn truncate_for_error(s: &str) -> String {
    if s.len() <= 50 {
        s.to_string()
    } else {
        format!("{}...", &s[..47])
    }
}

/// Sanitize a string for error messages to prevent log injection.
fn sanitize_for_error(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .take(50)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '?'
            }
        })
        .collect();

    if s.len() > 50 {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id_valid() {
        assert!(validate_user_id("user_123").is_ok());
        assert!(validate_user_id("9f8d2c1a-77b4-4f6e-9a2b-0c3d4e5f6a7b").is_ok());
        assert!(validate_user_id("A").is_ok());
    }

    #[test]
    fn test_validate_user_id_invalid() {
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"a".repeat(300)).is_err());
        assert!(validate_user_id("user 123").is_err());
        assert!(validate_user_id("user<script>").is_err());
        assert!(validate_user_id("user\n123").is_err());
        assert!(validate_user_id("user;DROP TABLE profiles").is_err());
    }

    #[test]
    fn test_validate_plan_key() {
        assert!(validate_plan_key("free").is_ok());
        assert!(validate_plan_key("business").is_ok());
        assert!(validate_plan_key("white_label").is_ok());

        assert!(validate_plan_key("").is_err());
        assert!(validate_plan_key("Starter").is_err());
        assert!(validate_plan_key("plan-1").is_err());
        assert!(validate_plan_key(&"a".repeat(100)).is_err());
    }

    fn valid_inquiry() -> AgencyInquiry {
        AgencyInquiry {
            name: "Asha Rao".to_string(),
            email: "asha@brandworks.example".to_string(),
            company: Some("Brandworks".to_string()),
            message: "We manage twelve D2C brands and need white-label funnels.".to_string(),
        }
    }

    #[test]
    fn test_validate_inquiry_valid() {
        assert!(validate_inquiry(&valid_inquiry()).is_ok());

        let mut no_company = valid_inquiry();
        no_company.company = None;
        assert!(validate_inquiry(&no_company).is_ok());
    }

    #[test]
    fn test_validate_inquiry_rejects_blank_fields() {
        let mut inquiry = valid_inquiry();
        inquiry.name = "   ".to_string();
        assert!(validate_inquiry(&inquiry).is_err());

        let mut inquiry = valid_inquiry();
        inquiry.message = "".to_string();
        assert!(validate_inquiry(&inquiry).is_err());
    }

    #[test]
    fn test_validate_inquiry_email_shapes() {
        for bad in ["", "not-an-email", "@example.com", "a@", "a@nodot", "a b@x.com"] {
            let mut inquiry = valid_inquiry();
            inquiry.email = bad.to_string();
            assert!(
                validate_inquiry(&inquiry).is_err(),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_validate_inquiry_length_caps() {
        let mut inquiry = valid_inquiry();
        inquiry.message = "x".repeat(5000);
        assert!(validate_inquiry(&inquiry).is_err());

        let mut inquiry = valid_inquiry();
        inquiry.company = Some("c".repeat(200));
        assert!(validate_inquiry(&inquiry).is_err());
    }

    #[test]
    fn test_sanitize_for_error() {
        assert_eq!(sanitize_for_error("valid_id"), "valid_id");
        assert_eq!(sanitize_for_error("has<bad>chars"), "has?bad?chars");

        let long = "a".repeat(100);
        let result = sanitize_for_error(&long);
        assert!(result.ends_with("..."));
        assert!(result.len() <= 53);
    }
}
