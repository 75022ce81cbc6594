//! User profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extra author information, at most one row per user.
/// Rendered as the author box under a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub image: Option<String>,
    pub address: Option<String>,
    pub biography: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields a user may change. Missing fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    pub image: Option<String>,
    pub address: Option<String>,
    pub biography: Option<String>,
}
