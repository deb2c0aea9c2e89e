use axum::extract::{Path, State};

use crate::api::errors::ApiError;
use crate::api::extract::{ApiQuery, ValidJson};
use crate::api::guards::CurrentAuthor;
use crate::api::response::{done, ok, ApiResult};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::exams::DeleteOutcome;
use crate::schemas::exam::{ExamResponse, PublishRequest};

use super::super::helpers;
use super::super::queries::DeleteExamQuery;

pub(in crate::api::exams) async fn publish_exam(
    Path(exam_id): Path<String>,
    CurrentAuthor(user): CurrentAuthor,
    state: State<AppState>,
    ValidJson(payload): ValidJson<PublishRequest>,
) -> ApiResult<ExamResponse> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_manager(&user, &exam)?;

    if payload.published {
        let questions = repositories::exams::count_questions(state.db(), &exam_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count exam questions"))?;
        if questions == 0 {
            return Err(ApiError::BadRequest(
                "Cannot publish an exam without questions".to_string(),
            ));
        }
    }

    let now = primitive_now_utc();
    let exam = repositories::exams::set_published(state.db(), &exam_id, payload.published, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update exam"))?
        .ok_or_else(helpers::not_found)?;

    tracing::info!(exam_id = %exam.id, published = exam.is_published, "Exam visibility changed");

    let message = if exam.is_published { "Exam published" } else { "Exam unpublished" };
    Ok(ok(message, ExamResponse::from(exam)))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    ApiQuery(params): ApiQuery<DeleteExamQuery>,
    CurrentAuthor(user): CurrentAuthor,
    state: State<AppState>,
) -> ApiResult<()> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_manager(&user, &exam)?;

    let outcome = repositories::exams::delete(state.db(), &exam_id, params.force_delete)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    match outcome {
        DeleteOutcome::Deleted => {
            tracing::info!(
                exam_id = %exam_id,
                user_id = %user.id,
                forced = params.force_delete,
                "Exam deleted"
            );
            Ok(done("Exam deleted"))
        }
        DeleteOutcome::NotFound => Err(helpers::not_found()),
        DeleteOutcome::HasSubmissions(count) => Err(ApiError::Conflict(format!(
            "Exam has {count} submission(s); pass force_delete=true to remove them"
        ))),
    }
}
