use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Router,
};

use crate::api::errors::ApiError;
use crate::api::extract::{ApiQuery, ValidJson};
use crate::api::guards::{CurrentAuthor, CurrentUser};
use crate::api::response::{created, ok, ApiResult};
use crate::api::validation::validate_media_upload;
use crate::core::config::Settings;
use crate::core::state::AppState;
use crate::schemas::upload::{
    PresignRequest, PresignResponse, UploadResponse, ViewUrlQuery, ViewUrlResponse,
};
use crate::services::storage::{self, StorageService};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn router(settings: &Settings) -> Router<AppState> {
    let body_limit = max_upload_bytes(settings) as usize + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", post(upload_media))
        .route("/presign", post(presign_upload))
        .route("/view-url", get(view_url))
        .layer(DefaultBodyLimit::max(body_limit))
}

async fn presign_upload(
    CurrentAuthor(user): CurrentAuthor,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<PresignRequest>,
) -> ApiResult<PresignResponse> {
    let extension = validate_media_upload(
        &payload.filename,
        &payload.content_type,
        &state.settings().storage().allowed_upload_extensions,
    )?;
    let storage = require_storage(&state)?;

    let key = storage::presign_key(&user.id, &extension);
    let upload_url = storage
        .presign_put(&key, &payload.content_type)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate upload URL"))?;

    Ok(ok(
        "Upload URL generated",
        PresignResponse {
            key,
            upload_url,
            method: "PUT",
            expires_in: storage.url_ttl().as_secs(),
        },
    ))
}

async fn upload_media(
    CurrentAuthor(user): CurrentAuthor,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadResponse> {
    let storage = require_storage(&state)?;
    let mut multipart =
        multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let max_bytes = max_upload_bytes(state.settings());

    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ApiError::BadRequest(format!(
                    "File size exceeds {}MB limit",
                    state.settings().storage().max_upload_size_mb
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some((filename, content_type, bytes));
    }

    let Some((filename, content_type, bytes)) = upload else {
        return Err(ApiError::BadRequest("Missing file field".to_string()));
    };
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    let extension = validate_media_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_upload_extensions,
    )?;

    let stored = storage
        .upload_media(&extension, &content_type, bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store upload"))?;

    tracing::info!(
        user_id = %user.id,
        key = %stored.key,
        size = stored.size,
        "Media uploaded"
    );

    Ok(created(
        "File uploaded",
        UploadResponse {
            key: stored.key,
            size: stored.size,
            sha256: stored.sha256,
            content_type,
        },
    ))
}

async fn view_url(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ViewUrlQuery>,
) -> ApiResult<ViewUrlResponse> {
    if !storage::is_media_key(&query.key) {
        return Err(ApiError::BadRequest("Unknown media key".to_string()));
    }
    let storage = require_storage(&state)?;

    let url = storage
        .presign_get(&query.key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate view URL"))?;

    Ok(ok(
        "View URL generated",
        ViewUrlResponse { key: query.key, url, expires_in: storage.url_ttl().as_secs() },
    ))
}

fn require_storage(state: &AppState) -> Result<&StorageService, ApiError> {
    state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("Object storage is not configured".to_string()))
}

fn max_upload_bytes(settings: &Settings) -> u64 {
    settings.storage().max_upload_size_mb * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn storage_disabled_returns_503() {
        let ctx = test_support::setup_test_context().await;
        let teacher = test_support::insert_teacher(ctx.state.db(), "prof").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/uploads/presign",
                Some(&token),
                Some(json!({ "filename": "diagram.png", "content_type": "image/png" })),
            ))
            .await
            .expect("presign");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = test_support::read_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn presign_returns_put_url_for_media_key() {
        let ctx = test_support::setup_test_context_with_storage().await;
        let teacher = test_support::insert_teacher(ctx.state.db(), "prof").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/uploads/presign",
                Some(&token),
                Some(json!({ "filename": "diagram.png", "content_type": "image/png" })),
            ))
            .await
            .expect("presign");

        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        let key = body["data"]["key"].as_str().expect("key");
        assert!(key.starts_with("question-media/"));
        assert!(key.ends_with(".png"));
        assert_eq!(body["data"]["method"], "PUT");
        assert!(body["data"]["upload_url"].as_str().unwrap().contains("X-Amz-Signature"));
    }

    #[tokio::test]
    async fn mismatched_mime_is_rejected() {
        let ctx = test_support::setup_test_context_with_storage().await;
        let teacher = test_support::insert_teacher(ctx.state.db(), "prof").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/uploads/presign",
                Some(&token),
                Some(json!({ "filename": "diagram.png", "content_type": "audio/mpeg" })),
            ))
            .await
            .expect("presign");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn view_url_refuses_foreign_keys() {
        let ctx = test_support::setup_test_context_with_storage().await;
        let student = test_support::insert_student(ctx.state.db(), "kid").await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/uploads/view-url?key=secrets/../db.dump",
                Some(&token),
                None,
            ))
            .await
            .expect("view url");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/uploads/view-url?key=question-media/ab/abcdef.png",
                Some(&token),
                None,
            ))
            .await
            .expect("view url");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["data"]["key"], "question-media/ab/abcdef.png");
    }

    #[tokio::test]
    async fn multipart_without_file_is_rejected() {
        let ctx = test_support::setup_test_context_with_storage().await;
        let teacher = test_support::insert_teacher(ctx.state.db(), "prof").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let boundary = "lms-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/uploads")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .expect("request");

        let response = ctx.app.clone().oneshot(request).await.expect("upload");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert_eq!(body["message"], "Missing file field");
    }
}
