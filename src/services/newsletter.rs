//! Newsletter subscriptions

use crate::db::repositories::NewsletterRepository;
use crate::models::{ListParams, Newsletter, PagedResult};
use crate::services::validation::{is_valid_email, normalize_email};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NewsletterServiceError {
    #[error("Subscription not found: {0}")]
    NotFound(i64),

    #[error("Email already subscribed: {0}")]
    AlreadySubscribed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NewsletterService {
    repo: Arc<dyn NewsletterRepository>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn NewsletterRepository>) -> Self {
        Self { repo }
    }

    /// Subscribe an address; addresses are unique case-insensitively
    pub async fn subscribe(&self, email: &str) -> Result<Newsletter, NewsletterServiceError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(NewsletterServiceError::ValidationError(
                "Enter a valid email address".to_string(),
            ));
        }
        if self
            .repo
            .get_by_email(&email)
            .await
            .context("Failed to check subscription")?
            .is_some()
        {
            return Err(NewsletterServiceError::AlreadySubscribed(email));
        }

        let subscription = self
            .repo
            .create(&email)
            .await
            .context("Failed to save subscription")?;
        tracing::info!(subscription_id = subscription.id, "Newsletter subscription added");
        Ok(subscription)
    }

    pub async fn get(&self, id: i64) -> Result<Newsletter, NewsletterServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get subscription")?
            .ok_or(NewsletterServiceError::NotFound(id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Newsletter>, NewsletterServiceError> {
        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list subscriptions")?;
        let total = self.repo.count().await.context("Failed to count subscriptions")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn delete(&self, id: i64) -> Result<(), NewsletterServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete subscription")? {
            return Err(NewsletterServiceError::NotFound(id));
        }
        Ok(())
    }
}
