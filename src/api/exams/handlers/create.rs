use axum::extract::{Path, State};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::extract::ValidJson;
use crate::api::guards::CurrentAuthor;
use crate::api::response::{created, ok, ApiResult};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamUpsert};

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    CurrentAuthor(user): CurrentAuthor,
    state: State<AppState>,
    ValidJson(payload): ValidJson<ExamUpsert>,
) -> ApiResult<ExamResponse> {
    helpers::ensure_questions_exist(&state, &payload).await?;

    let exam = repositories::exams::create_with_questions(
        state.db(),
        &Uuid::new_v4().to_string(),
        &user.id,
        helpers::exam_fields(&payload),
        &payload.links(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| helpers::map_link_error(e, "Failed to create exam"))?;

    tracing::info!(
        exam_id = %exam.id,
        created_by = %user.id,
        questions = payload.questions.len(),
        "Exam created"
    );

    Ok(created("Exam created", ExamResponse::from(exam)))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentAuthor(user): CurrentAuthor,
    state: State<AppState>,
    ValidJson(payload): ValidJson<ExamUpsert>,
) -> ApiResult<ExamResponse> {
    let existing = helpers::fetch_exam(&state, &exam_id).await?;
    helpers::ensure_manager(&user, &existing)?;

    if existing.is_published && payload.questions.is_empty() {
        return Err(ApiError::BadRequest(
            "A published exam must keep at least one question".to_string(),
        ));
    }

    helpers::ensure_questions_exist(&state, &payload).await?;

    let exam = repositories::exams::update_with_questions(
        state.db(),
        &exam_id,
        helpers::exam_fields(&payload),
        &payload.links(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| helpers::map_link_error(e, "Failed to update exam"))?
    .ok_or_else(helpers::not_found)?;

    tracing::info!(exam_id = %exam.id, user_id = %user.id, "Exam updated");

    Ok(ok("Exam updated", ExamResponse::from(exam)))
}
