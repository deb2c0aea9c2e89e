use rand::seq::SliceRandom;

use crate::api::errors::{is_foreign_key_violation, is_unique_violation, ApiError};
use crate::core::state::AppState;
use crate::db::models::{Exam, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::exams::{ExamDetail, ExamFields};
use crate::schemas::exam::{ExamDetailResponse, ExamQuestionResponse, ExamResponse, ExamUpsert};
use crate::services::question_content::QuestionContent;

/// Admins manage every exam, teachers only their own.
pub(super) fn can_manage(user: &User, exam: &Exam) -> bool {
    user.role == UserRole::Admin || (user.role.can_author() && exam.created_by == user.id)
}

pub(super) fn ensure_manager(user: &User, exam: &Exam) -> Result<(), ApiError> {
    if can_manage(user, exam) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions"))
    }
}

pub(super) async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(not_found)
}

pub(super) fn not_found() -> ApiError {
    ApiError::NotFound("Exam not found".to_string())
}

pub(super) fn exam_fields(payload: &ExamUpsert) -> ExamFields<'_> {
    ExamFields {
        course_id: payload.course_id.as_deref().map(str::trim).filter(|value| !value.is_empty()),
        title: payload.title.trim(),
        description: payload.description.as_deref(),
        duration_minutes: payload.duration_minutes,
        passing_score: payload.passing_score,
        randomize_questions: payload.randomize_questions,
    }
}

/// Rejects payloads linking questions that do not exist, before any write.
pub(super) async fn ensure_questions_exist(
    state: &AppState,
    payload: &ExamUpsert,
) -> Result<(), ApiError> {
    let ids: Vec<String> =
        payload.questions.iter().map(|question| question.question_id.clone()).collect();

    let missing = repositories::questions::missing_ids(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check exam questions"))?;
    if missing.is_empty() {
        return Ok(());
    }

    Err(ApiError::Validation(
        missing.into_iter().map(|id| format!("questions: unknown question {id}")).collect(),
    ))
}

/// Link writes that still trip a constraint (a question deleted meanwhile, a
/// concurrent duplicate) are reported instead of surfacing as 500.
pub(super) fn map_link_error(err: sqlx::Error, context: &str) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::Conflict("Exam questions must have unique ids and sequences".to_string())
    } else if is_foreign_key_violation(&err) {
        ApiError::Validation(vec!["questions: unknown question".to_string()])
    } else {
        ApiError::internal(err, context)
    }
}

/// Managers see the stored choices; everyone else gets redacted choices, and
/// the question order is shuffled when the exam asks for it.
pub(super) fn detail_response(detail: ExamDetail, manager: bool) -> ExamDetailResponse {
    let ExamDetail { exam, questions } = detail;
    let total_points: f64 = questions.iter().map(|question| question.points).sum();
    let shuffle = !manager && exam.randomize_questions;

    let mut questions: Vec<ExamQuestionResponse> = questions
        .into_iter()
        .map(|question| {
            let choices = if manager {
                question.choices.0.clone()
            } else {
                match QuestionContent::from_parts(question.question_type, &question.choices.0) {
                    Ok(content) => content.redacted_json(),
                    Err(err) => {
                        tracing::warn!(
                            question_id = %question.question_id,
                            error = %err,
                            "Stored question content is invalid; hiding choices"
                        );
                        serde_json::Value::Null
                    }
                }
            };
            ExamQuestionResponse::from_detail(question, choices)
        })
        .collect();

    if shuffle {
        questions.shuffle(&mut rand::thread_rng());
    }

    ExamDetailResponse { exam: ExamResponse::from(exam), total_points, questions }
}
