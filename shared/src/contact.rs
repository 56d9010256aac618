//! In-memory store for contact form submissions.
//!
//! Submissions live for the lifetime of the function instance only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::Result;

/// Contact form payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "email address is invalid"))]
    pub email: String,
    #[validate(length(max = 200, message = "subject must be at most 200 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "message must be 1-5000 characters"))]
    pub message: String,
}

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ContactStore {
    submissions: RwLock<Vec<ContactSubmission>>,
}

impl ContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record a submission.
    pub async fn submit(&self, request: ContactRequest) -> Result<ContactSubmission> {
        let request = ContactRequest {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            subject: request
                .subject
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            message: request.message.trim().to_string(),
        };
        request.validate()?;

        let submission = ContactSubmission {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            subject: request.subject,
            message: request.message,
            received_at: Utc::now(),
        };

        let mut submissions = self.submissions.write().await;
        submissions.push(submission.clone());
        info!(
            "Stored contact submission {} ({} held by this instance)",
            submission.id,
            submissions.len()
        );
        Ok(submission)
    }

    pub async fn len(&self) -> usize {
        self.submissions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.submissions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn request(name: &str, email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: name.to_string(),
            email: email.to_string(),
            subject: None,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_stores_trimmed_submission() {
        let store = ContactStore::new();
        let submission = store
            .submit(ContactRequest {
                subject: Some("   ".to_string()),
                ..request(" Ada ", "ada@example.com ", "Booking for June?\n")
            })
            .await
            .unwrap();

        assert_eq!(submission.name, "Ada");
        assert_eq!(submission.email, "ada@example.com");
        assert_eq!(submission.message, "Booking for June?");
        assert!(submission.subject.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_submission_is_rejected() {
        let store = ContactStore::new();

        let err = store.submit(request("Ada", "not-an-email", "hello")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = store.submit(request("   ", "ada@example.com", "hello")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let long = "x".repeat(5001);
        assert!(store.submit(request("Ada", "ada@example.com", &long)).await.is_err());

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_submissions_get_distinct_ids() {
        let store = ContactStore::new();
        let first = store.submit(request("First", "a@example.com", "one")).await.unwrap();
        let second = store.submit(request("Second", "b@example.com", "two")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.len().await, 2);
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: ContactRequest = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","message":"Hi there"}"#,
        )
        .unwrap();
        assert!(request.subject.is_none());
        assert!(request.validate().is_ok());
    }
}
