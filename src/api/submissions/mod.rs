use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::{ApiQuery, ValidJson};
use crate::api::guards::{ensure_owner_or_admin, CurrentUser};
use crate::api::pagination::{Page, PaginatedResponse};
use crate::api::response::{created, ok, ApiResult};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::submission::{
    GradeRequest, GradeResponse, SubmissionCreate, SubmissionDetailResponse, SubmissionListItem,
    SubmissionListQuery, SubmissionResponse,
};
use crate::schemas::PageParams;
use crate::services::grading;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_submission).get(list_submissions))
        .route("/:submission_id", get(get_submission))
        .route("/:submission_id/grade", post(grade_submission))
}

async fn start_submission(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SubmissionCreate>,
) -> ApiResult<SubmissionResponse> {
    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let manages_exam = user.role == UserRole::Admin || exam.created_by == user.id;
    if !exam.is_published && !manages_exam {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    let submission = repositories::submissions::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &exam.id,
        &user.id,
        true,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to start submission"))?;

    tracing::info!(
        submission_id = %submission.id,
        exam_id = %exam.id,
        user_id = %user.id,
        "Submission started"
    );

    Ok(created("Submission started", SubmissionResponse::from(submission)))
}

async fn grade_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<GradeRequest>,
) -> ApiResult<GradeResponse> {
    let outcome = grading::grade_submission(
        state.db(),
        state.notifier(),
        &user,
        &submission_id,
        &payload.answers,
    )
    .await?;

    Ok(ok("Submission graded", GradeResponse::from(outcome)))
}

async fn get_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<SubmissionDetailResponse> {
    let details = repositories::submissions::find_details(state.db(), &submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    ensure_owner_or_admin(&user, &details.header.user_id)?;

    Ok(ok("Submission retrieved", SubmissionDetailResponse::from(details)))
}

/// Students and teachers read their own history; admins may pass `userId`.
async fn list_submissions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SubmissionListQuery>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<PaginatedResponse<SubmissionListItem>> {
    let page = Page::from(page);
    let user_id = query.user_id.unwrap_or_else(|| user.id.clone());
    ensure_owner_or_admin(&user, &user_id)?;

    let rows = repositories::submissions::list_by_user(
        state.db(),
        &user_id,
        page.offset(),
        page.page_size,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
    let total = repositories::submissions::count_by_user(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    let items = rows.into_iter().map(SubmissionListItem::from).collect();
    Ok(ok("Submissions retrieved", PaginatedResponse::new(items, total, page)))
}
