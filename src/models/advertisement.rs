//! Advertisement model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sidebar advertisement. The most recently created one is displayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advertisement {
    pub id: i64,
    pub title: String,
    /// Path or URL of the banner image
    pub image: String,
    /// Click-through target
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating or replacing an advertisement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertisementInput {
    pub title: String,
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
}
