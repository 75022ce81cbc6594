//! Newsletter subscription model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A newsletter subscription, keyed by a unique email address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Newsletter {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
