//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::ListParams;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for list endpoints
pub fn default_page_size() -> u32 {
    10
}

/// Pagination and search query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Free-text filter, only honoured by post listings
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            search: None,
        }
    }
}

impl ListQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.page_size)
    }
}

/// Request body naming a single object
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: i64,
}

/// Request body for resources that only carry a name
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

/// Partial update for resources that only carry a name
#[derive(Debug, Default, Deserialize)]
pub struct NamePatch {
    pub name: Option<String>,
}
