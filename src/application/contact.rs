//! Contact submissions: validation plus the form-relay hop.
//!
//! Every field is validated before any network I/O so a rejection lists
//! the complete set of problems; the relay answer degrades to a static
//! failure string, with no retry.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::validate;
use crate::infra::relay::{FormRelay, RelayError};

const MAX_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;
const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

const ACCEPTED_FALLBACK: &str = "Form submitted successfully";
const FAILED_FALLBACK: &str = "Failed to send message; please try again later";

#[derive(Debug, Clone, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("submission failed validation")]
    Invalid { violations: Vec<FieldViolation> },
    #[error("form relay not configured")]
    NotConfigured,
    #[error("form relay rejected the submission")]
    Rejected { message: Option<String> },
    #[error("form relay unreachable: {message}")]
    Unavailable { message: String },
}

#[derive(Debug, Clone)]
pub struct ContactReceipt {
    pub message: String,
}

pub struct ContactService {
    relay: Arc<dyn FormRelay>,
}

impl ContactService {
    pub fn new(relay: Arc<dyn FormRelay>) -> Self {
        Self { relay }
    }

    pub fn validate(submission: &ContactSubmission) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        push_violation(
            &mut violations,
            "name",
            validate::required_text(&submission.name, MAX_NAME_LEN),
        );

        let mut email_failures = validate::required_text(&submission.email, MAX_EMAIL_LEN);
        if email_failures.is_empty() {
            email_failures = validate::email(&submission.email);
        }
        push_violation(&mut violations, "email", email_failures);

        push_violation(
            &mut violations,
            "subject",
            validate::optional_text(&submission.subject, MAX_SUBJECT_LEN),
        );
        push_violation(
            &mut violations,
            "message",
            validate::required_text(&submission.message, MAX_MESSAGE_LEN),
        );
        violations
    }

    pub async fn submit(
        &self,
        submission: ContactSubmission,
    ) -> Result<ContactReceipt, ContactError> {
        let violations = Self::validate(&submission);
        if !violations.is_empty() {
            return Err(ContactError::Invalid { violations });
        }

        match self.relay.submit(&submission).await {
            Ok(acceptance) if acceptance.success => Ok(ContactReceipt {
                message: acceptance
                    .message
                    .unwrap_or_else(|| ACCEPTED_FALLBACK.to_string()),
            }),
            Ok(acceptance) => {
                counter!("vetrina_contact_relay_failure_total").increment(1);
                warn!(
                    target = "vetrina::contact",
                    message = acceptance.message.as_deref().unwrap_or(""),
                    "relay rejected submission"
                );
                Err(ContactError::Rejected {
                    message: acceptance.message,
                })
            }
            Err(RelayError::NotConfigured) => Err(ContactError::NotConfigured),
            Err(err) => {
                counter!("vetrina_contact_relay_failure_total").increment(1);
                warn!(target = "vetrina::contact", error = %err, "relay unreachable");
                Err(ContactError::Unavailable {
                    message: FAILED_FALLBACK.to_string(),
                })
            }
        }
    }
}

fn push_violation(
    violations: &mut Vec<FieldViolation>,
    field: &'static str,
    messages: Vec<String>,
) {
    if !messages.is_empty() {
        violations.push(FieldViolation { field, messages });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            subject: "Analytical engines".to_string(),
            message: "I have a proposal.".to_string(),
        }
    }

    #[test]
    fn a_clean_submission_passes_validation() {
        assert!(ContactService::validate(&submission()).is_empty());
    }

    #[test]
    fn every_failing_field_is_listed() {
        let bad = ContactSubmission {
            name: String::new(),
            email: "not-an-email".to_string(),
            subject: String::new(),
            message: String::new(),
        };
        let violations = ContactService::validate(&bad);
        let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["name", "email", "message"]);
    }

    #[test]
    fn suspicious_message_content_is_rejected() {
        let mut bad = submission();
        bad.message = "<script>alert(1)</script>".to_string();
        let violations = ContactService::validate(&bad);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "message");
    }
}
