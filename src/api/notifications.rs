use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{Page, PaginatedResponse};
use crate::api::response::{ok, ApiResult};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::notification::{
    MarkAllReadResponse, NotificationListQuery, NotificationResponse,
};
use crate::schemas::PageParams;

#[derive(Debug, Serialize)]
struct NotificationPage {
    #[serde(flatten)]
    page: PaginatedResponse<NotificationResponse>,
    unread_count: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:notification_id/read", post(mark_read))
}

async fn list_notifications(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NotificationListQuery>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<NotificationPage> {
    let page = Page::from(page);

    let notifications = repositories::notifications::list_by_user(
        state.db(),
        &user.id,
        query.unread_only,
        page.offset(),
        page.page_size,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list notifications"))?;
    let (total, unread_count) =
        repositories::notifications::counts_by_user(state.db(), &user.id, query.unread_only)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count notifications"))?;

    let items = notifications.into_iter().map(NotificationResponse::from).collect();
    Ok(ok(
        "Notifications retrieved",
        NotificationPage { page: PaginatedResponse::new(items, total, page), unread_count },
    ))
}

async fn mark_read(
    Path(notification_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<NotificationResponse> {
    let notification = repositories::notifications::mark_read(
        state.db(),
        &notification_id,
        &user.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update notification"))?
    .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(ok("Notification marked as read", NotificationResponse::from(notification)))
}

async fn mark_all_read(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<MarkAllReadResponse> {
    let updated =
        repositories::notifications::mark_all_read(state.db(), &user.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update notifications"))?;

    Ok(ok("Notifications marked as read", MarkAllReadResponse { updated }))
}
