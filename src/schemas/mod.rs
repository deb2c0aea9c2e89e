use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::ValidationError;

pub(crate) mod auth;
pub(crate) mod exam;
pub(crate) mod notification;
pub(crate) mod question;
pub(crate) mod submission;
pub(crate) mod upload;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

/// Titles are stored trimmed, so the trimmed value is what must be non-empty.
pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    let length = title.trim().chars().count();
    if (1..=500).contains(&length) {
        return Ok(());
    }
    Err(ValidationError::new("title_length").with_message("title must be 1..500 characters".into()))
}

/// `page`/`pageSize` query pair shared by every list endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct PageParams {
    #[serde(default = "default_page")]
    pub(crate) page: i64,
    #[serde(default = "default_page_size", alias = "pageSize")]
    pub(crate) page_size: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: default_page(), page_size: default_page_size() }
    }
}

const fn default_page() -> i64 {
    1
}

const fn default_page_size() -> i64 {
    20
}
