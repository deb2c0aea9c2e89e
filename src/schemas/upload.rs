use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PresignRequest {
    #[validate(length(min = 1, max = 255, message = "filename must be 1..255 characters"))]
    pub(crate) filename: String,
    #[serde(alias = "contentType")]
    #[validate(length(min = 1, message = "content_type must not be empty"))]
    pub(crate) content_type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PresignResponse {
    pub(crate) key: String,
    pub(crate) upload_url: String,
    pub(crate) method: &'static str,
    pub(crate) expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ViewUrlQuery {
    pub(crate) key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ViewUrlResponse {
    pub(crate) key: String,
    pub(crate) url: String,
    pub(crate) expires_in: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) key: String,
    pub(crate) size: u64,
    pub(crate) sha256: String,
    pub(crate) content_type: String,
}
