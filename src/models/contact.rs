//! Contact message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message submitted through the contact form.
///
/// Contact messages are write-once: visitors create them, staff read and
/// delete them, nobody edits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a contact message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContactInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}
