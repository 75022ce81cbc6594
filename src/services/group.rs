//! Group service

use crate::db::repositories::GroupRepository;
use crate::models::Group;
use anyhow::Context;
use std::sync::Arc;

const MAX_GROUP_NAME_LENGTH: usize = 150;

#[derive(Debug, thiserror::Error)]
pub enum GroupServiceError {
    #[error("Group not found: {0}")]
    NotFound(i64),

    #[error("Group name already exists: {0}")]
    DuplicateName(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct GroupService {
    repo: Arc<dyn GroupRepository>,
}

impl GroupService {
    pub fn new(repo: Arc<dyn GroupRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Group>, GroupServiceError> {
        Ok(self.repo.list().await.context("Failed to list groups")?)
    }

    pub async fn get(&self, id: i64) -> Result<Group, GroupServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get group")?
            .ok_or(GroupServiceError::NotFound(id))
    }

    pub async fn create(&self, name: &str) -> Result<Group, GroupServiceError> {
        let name = self.checked_name(name, None).await?;
        Ok(self.repo.create(&name).await.context("Failed to create group")?)
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<Group, GroupServiceError> {
        let name = self.checked_name(name, Some(id)).await?;
        self.repo
            .rename(id, &name)
            .await
            .context("Failed to rename group")?
            .ok_or(GroupServiceError::NotFound(id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), GroupServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete group")? {
            return Err(GroupServiceError::NotFound(id));
        }
        Ok(())
    }

    async fn checked_name(&self, name: &str, except: Option<i64>) -> Result<String, GroupServiceError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_GROUP_NAME_LENGTH {
            return Err(GroupServiceError::ValidationError(format!(
                "Group name must be between 1 and {} characters",
                MAX_GROUP_NAME_LENGTH
            )));
        }
        let clash = self
            .list()
            .await?
            .into_iter()
            .any(|g| g.name == name && Some(g.id) != except);
        if clash {
            return Err(GroupServiceError::DuplicateName(name.to_string()));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxGroupRepository;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_group_lifecycle() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.unwrap();
        let service = GroupService::new(SqlxGroupRepository::boxed(pool));

        let group = service.create(" editors ").await.unwrap();
        assert_eq!(group.name, "editors");
        assert!(matches!(
            service.create("editors").await,
            Err(GroupServiceError::DuplicateName(_))
        ));
        assert!(matches!(service.create(" ").await, Err(GroupServiceError::ValidationError(_))));

        assert_eq!(service.rename(group.id, "editors").await.unwrap().id, group.id);
        assert!(matches!(service.rename(42, "x").await, Err(GroupServiceError::NotFound(42))));

        service.delete(group.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }
}
