//! Tag service

use crate::db::repositories::TagRepository;
use crate::models::{ListParams, PagedResult, Tag};
use anyhow::Context;
use std::sync::Arc;

/// Maximum tag name length in characters
pub const MAX_TAG_LENGTH: usize = 100;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found: {0}")]
    NotFound(i64),

    #[error("Tag name already exists: {0}")]
    DuplicateName(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str) -> Result<Tag, TagServiceError> {
        let name = validate_tag_name(name)?;
        self.ensure_name_free(&name, None).await?;
        Ok(self.repo.create(&name).await.context("Failed to create tag")?)
    }

    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or(TagServiceError::NotFound(id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Tag>, TagServiceError> {
        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list tags")?;
        let total = self.repo.count().await.context("Failed to count tags")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn list_all(&self) -> Result<Vec<Tag>, TagServiceError> {
        let total = self.repo.count().await.context("Failed to count tags")?;
        Ok(self
            .repo
            .list(0, total.max(1))
            .await
            .context("Failed to list tags")?)
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<Tag, TagServiceError> {
        self.get(id).await?;
        let name = validate_tag_name(name)?;
        self.ensure_name_free(&name, Some(id)).await?;
        Ok(self.repo.rename(id, &name).await.context("Failed to rename tag")?)
    }

    /// Delete a tag; posts simply lose the link
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete tag")? {
            return Err(TagServiceError::NotFound(id));
        }
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i64>) -> Result<(), TagServiceError> {
        match self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check tag name")?
        {
            Some(tag) if Some(tag.id) != except => Err(TagServiceError::DuplicateName(name.to_string())),
            _ => Ok(()),
        }
    }
}

fn validate_tag_name(name: &str) -> Result<String, TagServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagServiceError::ValidationError("Tag name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_TAG_LENGTH {
        return Err(TagServiceError::ValidationError(format!(
            "Tag name cannot exceed {} characters",
            MAX_TAG_LENGTH
        )));
    }
    Ok(name.to_string())
}
