//! Category service
//!
//! Category CRUD with unique, non-blank names. Deleting a category removes
//! its posts through the foreign key cascade.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput, ListParams, PagedResult, UpdateCategoryInput};
use anyhow::Context;
use std::sync::Arc;

/// Maximum category name length in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a category; names are trimmed and must be unique
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;
        self.ensure_name_free(&name, None).await?;

        let input = CreateCategoryInput {
            name,
            description: normalize_description(input.description),
        };
        let created = self
            .repo
            .create(&input)
            .await
            .context("Failed to create category")?;

        tracing::debug!(category_id = created.id, name = %created.name, "Category created");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound(id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Category>, CategoryServiceError> {
        let items = self
            .repo
            .list(params.offset(), params.limit())
            .await
            .context("Failed to list categories")?;
        let total = self.repo.count().await.context("Failed to count categories")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Every category, for navigation and sidebars
    pub async fn list_all(&self) -> Result<Vec<Category>, CategoryServiceError> {
        let total = self.repo.count().await.context("Failed to count categories")?;
        Ok(self
            .repo
            .list(0, total.max(1))
            .await
            .context("Failed to list categories")?)
    }

    pub async fn update(
        &self,
        id: i64,
        mut input: UpdateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        self.get(id).await?;

        if let Some(name) = &input.name {
            let name = validate_name(name)?;
            self.ensure_name_free(&name, Some(id)).await?;
            input.name = Some(name);
        }
        if let Some(description) = input.description.take() {
            input.description = Some(normalize_description(description));
        }

        Ok(self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update category")?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete category")? {
            return Err(CategoryServiceError::NotFound(id));
        }
        tracing::info!(category_id = id, "Category deleted with its posts");
        Ok(())
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i64>) -> Result<(), CategoryServiceError> {
        let existing = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check category name")?;
        match existing {
            Some(category) if Some(category.id) != except => {
                Err(CategoryServiceError::DuplicateName(name.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn validate_name(name: &str) -> Result<String, CategoryServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category name cannot exceed {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Blank descriptions are stored as NULL
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        CategoryService::new(SqlxCategoryRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_create_trims_and_rejects_duplicates() {
        let service = setup_test_service().await;
        let created = service
            .create(CreateCategoryInput::new("  Sports ").with_description("  "))
            .await
            .unwrap();
        assert_eq!(created.name, "Sports");
        assert!(created.description.is_none());

        let duplicate = service.create(CreateCategoryInput::new("Sports")).await;
        assert!(matches!(duplicate, Err(CategoryServiceError::DuplicateName(_))));

        let blank = service.create(CreateCategoryInput::new("  ")).await;
        assert!(matches!(blank, Err(CategoryServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_own_name() {
        let service = setup_test_service().await;
        let sports = service.create(CreateCategoryInput::new("Sports")).await.unwrap();
        service.create(CreateCategoryInput::new("Business")).await.unwrap();

        let same = service
            .update(
                sports.id,
                UpdateCategoryInput {
                    name: Some("Sports".to_string()),
                    description: Some(Some("Scores".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(same.description.as_deref(), Some("Scores"));

        let clash = service
            .update(
                sports.id,
                UpdateCategoryInput {
                    name: Some("Business".to_string()),
                    description: None,
                },
            )
            .await;
        assert!(matches!(clash, Err(CategoryServiceError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let service = setup_test_service().await;
        for name in ["B", "A", "C"] {
            service.create(CreateCategoryInput::new(name)).await.unwrap();
        }

        let page = service.list(&ListParams::new(1, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(service.list_all().await.unwrap().len(), 3);

        let first = page.items[0].id;
        service.delete(first).await.unwrap();
        assert!(matches!(service.get(first).await, Err(CategoryServiceError::NotFound(_))));
        assert!(matches!(service.delete(first).await, Err(CategoryServiceError::NotFound(_))));
    }
}
