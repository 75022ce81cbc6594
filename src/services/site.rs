//! Site content service
//!
//! The auxiliary display entities (advertisements, the team roster and
//! user profiles) plus the sidebar shown on every public page.

use crate::db::repositories::{
    AdvertisementRepository, CategoryRepository, PostRepository, TagRepository,
    TeamMemberRepository, UserProfileRepository,
};
use crate::models::{
    Advertisement, AdvertisementInput, Category, Post, PostOrder, PostQuery, Tag, TeamMember,
    TeamMemberInput, UpdateProfileInput, UserProfile,
};
use crate::services::validation::required_text;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

const SIDEBAR_POPULAR: i64 = 5;
const MAX_SHORT_TEXT: usize = 255;
const MAX_LONG_TEXT: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum SiteServiceError {
    #[error("{0} not found: {1}")]
    NotFound(&'static str, i64),

    /// Invalid input; the first field is the offending field name
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Context shared by every public page
#[derive(Debug, Clone, Serialize, Default)]
pub struct Sidebar {
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub popular_posts: Vec<Post>,
    pub advertisement: Option<Advertisement>,
}

pub struct SiteService {
    ads: Arc<dyn AdvertisementRepository>,
    team: Arc<dyn TeamMemberRepository>,
    profiles: Arc<dyn UserProfileRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    posts: Arc<dyn PostRepository>,
}

impl SiteService {
    pub fn new(
        ads: Arc<dyn AdvertisementRepository>,
        team: Arc<dyn TeamMemberRepository>,
        profiles: Arc<dyn UserProfileRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
        posts: Arc<dyn PostRepository>,
    ) -> Self {
        Self {
            ads,
            team,
            profiles,
            categories,
            tags,
            posts,
        }
    }

    /// Categories, tags, recent posts and the newest advertisement
    pub async fn sidebar(&self) -> Result<Sidebar, SiteServiceError> {
        let category_count = self.categories.count().await.context("Failed to count categories")?;
        let categories = self
            .categories
            .list(0, category_count.max(1))
            .await
            .context("Failed to list categories")?;
        let tag_count = self.tags.count().await.context("Failed to count tags")?;
        let tags = self
            .tags
            .list(0, tag_count.max(1))
            .await
            .context("Failed to list tags")?;
        let popular_posts = self
            .posts
            .find(&PostQuery::published(), PostOrder::Latest, 0, SIDEBAR_POPULAR)
            .await
            .context("Failed to list popular posts")?;
        let advertisement = self.ads.latest().await.context("Failed to load advertisement")?;

        Ok(Sidebar {
            categories,
            tags,
            popular_posts,
            advertisement,
        })
    }

    // ========================================================================
    // Advertisements
    // ========================================================================

    pub async fn list_ads(&self) -> Result<Vec<Advertisement>, SiteServiceError> {
        Ok(self.ads.list().await.context("Failed to list advertisements")?)
    }

    pub async fn get_ad(&self, id: i64) -> Result<Advertisement, SiteServiceError> {
        self.ads
            .get_by_id(id)
            .await
            .context("Failed to get advertisement")?
            .ok_or(SiteServiceError::NotFound("Advertisement", id))
    }

    pub async fn create_ad(&self, input: AdvertisementInput) -> Result<Advertisement, SiteServiceError> {
        let input = validate_ad(input)?;
        Ok(self.ads.create(&input).await.context("Failed to create advertisement")?)
    }

    pub async fn update_ad(
        &self,
        id: i64,
        input: AdvertisementInput,
    ) -> Result<Advertisement, SiteServiceError> {
        let input = validate_ad(input)?;
        self.ads
            .update(id, &input)
            .await
            .context("Failed to update advertisement")?
            .ok_or(SiteServiceError::NotFound("Advertisement", id))
    }

    pub async fn delete_ad(&self, id: i64) -> Result<(), SiteServiceError> {
        if !self.ads.delete(id).await.context("Failed to delete advertisement")? {
            return Err(SiteServiceError::NotFound("Advertisement", id));
        }
        Ok(())
    }

    // ========================================================================
    // Team
    // ========================================================================

    pub async fn list_team(&self) -> Result<Vec<TeamMember>, SiteServiceError> {
        Ok(self.team.list().await.context("Failed to list team members")?)
    }

    pub async fn get_member(&self, id: i64) -> Result<TeamMember, SiteServiceError> {
        self.team
            .get_by_id(id)
            .await
            .context("Failed to get team member")?
            .ok_or(SiteServiceError::NotFound("Team member", id))
    }

    pub async fn create_member(&self, input: TeamMemberInput) -> Result<TeamMember, SiteServiceError> {
        let input = validate_member(input)?;
        Ok(self.team.create(&input).await.context("Failed to create team member")?)
    }

    pub async fn update_member(
        &self,
        id: i64,
        input: TeamMemberInput,
    ) -> Result<TeamMember, SiteServiceError> {
        let input = validate_member(input)?;
        self.team
            .update(id, &input)
            .await
            .context("Failed to update team member")?
            .ok_or(SiteServiceError::NotFound("Team member", id))
    }

    pub async fn delete_member(&self, id: i64) -> Result<(), SiteServiceError> {
        if !self.team.delete(id).await.context("Failed to delete team member")? {
            return Err(SiteServiceError::NotFound("Team member", id));
        }
        Ok(())
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    pub async fn profile(&self, user_id: i64) -> Result<Option<UserProfile>, SiteServiceError> {
        Ok(self
            .profiles
            .get_by_user(user_id)
            .await
            .context("Failed to get user profile")?)
    }

    /// Merge the given fields into the user's profile, creating it if needed
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, SiteServiceError> {
        let too_long = |field: &'static str, value: &Option<String>, max: usize| {
            match value {
                Some(v) if v.chars().count() > max => Err(SiteServiceError::ValidationError(
                    field,
                    format!("{} cannot exceed {} characters", field, max),
                )),
                _ => Ok(()),
            }
        };
        too_long("image", &input.image, MAX_SHORT_TEXT)?;
        too_long("address", &input.address, MAX_SHORT_TEXT)?;
        too_long("biography", &input.biography, MAX_LONG_TEXT)?;

        Ok(self
            .profiles
            .upsert(user_id, &input)
            .await
            .context("Failed to save user profile")?)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, SiteServiceError> {
    required_text(value, MAX_SHORT_TEXT).ok_or_else(|| {
        SiteServiceError::ValidationError(
            field,
            format!("{} must be between 1 and {} characters", field, MAX_SHORT_TEXT),
        )
    })
}

fn validate_ad(input: AdvertisementInput) -> Result<AdvertisementInput, SiteServiceError> {
    Ok(AdvertisementInput {
        title: required("title", &input.title)?,
        image: required("image", &input.image)?,
        link: input
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
    })
}

fn validate_member(input: TeamMemberInput) -> Result<TeamMemberInput, SiteServiceError> {
    Ok(TeamMemberInput {
        name: required("name", &input.name)?,
        position: required("position", &input.position)?,
        image: input.image.filter(|i| !i.trim().is_empty()),
        description: input.description.filter(|d| !d.trim().is_empty()),
    })
}
