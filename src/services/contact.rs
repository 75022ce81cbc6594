//! Contact service
//!
//! Anyone may leave a message; reading and deleting them is for signed-in
//! users. Messages are never edited.

use crate::db::repositories::ContactRepository;
use crate::models::{Contact, CreateContactInput, ListParams, PagedResult};
use crate::services::validation::{is_valid_email, normalize_email, required_text};
use anyhow::Context;
use std::sync::Arc;

const MAX_NAME_LENGTH: usize = 100;
const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    #[error("Contact message not found: {0}")]
    NotFound(i64),

    /// Invalid input; the first field is the offending field name
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    pub async fn submit(&self, input: CreateContactInput) -> Result<Contact, ContactServiceError> {
        let input = validate(input)?;
        let contact = self
            .repo
            .create(&input)
            .await
            .context("Failed to save contact message")?;
        tracing::info!(contact_id = contact.id, "Contact message received");
        Ok(contact)
    }

    pub async fn get(&self, id: i64) -> Result<Contact, ContactServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get contact message")?
            .ok_or(ContactServiceError::NotFound(id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Contact>, ContactServiceError> {
        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list contact messages")?;
        let total = self.repo.count().await.context("Failed to count contact messages")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContactServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete contact message")? {
            return Err(ContactServiceError::NotFound(id));
        }
        Ok(())
    }
}

fn validate(input: CreateContactInput) -> Result<CreateContactInput, ContactServiceError> {
    let field = |name: &'static str, value: &str, max: usize| {
        required_text(value, max).ok_or_else(|| {
            ContactServiceError::ValidationError(
                name,
                format!("{} must be between 1 and {} characters", name, max),
            )
        })
    };

    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(ContactServiceError::ValidationError(
            "email",
            "Enter a valid email address".to_string(),
        ));
    }

    Ok(CreateContactInput {
        name: field("name", &input.name, MAX_NAME_LENGTH)?,
        email,
        subject: field("subject", &input.subject, MAX_SUBJECT_LENGTH)?,
        message: field("message", &input.message, MAX_MESSAGE_LENGTH)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxContactRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> ContactService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        ContactService::new(SqlxContactRepository::boxed(pool))
    }

    fn input() -> CreateContactInput {
        CreateContactInput {
            name: "Sam".to_string(),
            email: " Sam@Example.com ".to_string(),
            subject: "Tip".to_string(),
            message: "There is a story here".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_normalizes_email() {
        let service = setup_test_service().await;
        let contact = service.submit(input()).await.unwrap();
        assert_eq!(contact.email, "sam@example.com");
        assert_eq!(service.get(contact.id).await.unwrap().subject, "Tip");
        assert_eq!(service.list(&ListParams::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_submit_reports_offending_field() {
        let service = setup_test_service().await;

        let mut bad = input();
        bad.email = "nope".to_string();
        assert!(matches!(
            service.submit(bad).await,
            Err(ContactServiceError::ValidationError("email", _))
        ));

        let mut bad = input();
        bad.message = "  ".to_string();
        assert!(matches!(
            service.submit(bad).await,
            Err(ContactServiceError::ValidationError("message", _))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = setup_test_service().await;
        let contact = service.submit(input()).await.unwrap();
        service.delete(contact.id).await.unwrap();
        assert!(matches!(service.get(contact.id).await, Err(ContactServiceError::NotFound(_))));
    }
}
