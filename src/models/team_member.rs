//! Team member model ("our team" section of the about page)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub name: String,
    /// Job title, e.g. "Editor in chief"
    pub position: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or replacing a team member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberInput {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
