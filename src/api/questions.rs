use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::api::errors::{is_foreign_key_violation, ApiError};
use crate::api::extract::{ApiQuery, ValidJson};
use crate::api::guards::{ensure_owner_or_admin, CurrentAuthor};
use crate::api::pagination::{Page, PaginatedResponse};
use crate::api::response::{created, done, ok, ApiResult};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::repositories;
use crate::repositories::questions::{QuestionFields, QuestionFilter};
use crate::schemas::question::{QuestionListQuery, QuestionResponse, QuestionUpsert};
use crate::schemas::PageParams;
use crate::services::question_content::QuestionContent;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_question).get(list_questions))
        .route("/:question_id", get(get_question).put(update_question).delete(delete_question))
}

async fn create_question(
    CurrentAuthor(user): CurrentAuthor,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<QuestionUpsert>,
) -> ApiResult<QuestionResponse> {
    let content = parse_content(&payload)?;

    let question = repositories::questions::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &user.id,
        fields(&payload, &content),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    tracing::info!(
        question_id = %question.id,
        author_id = %user.id,
        question_type = question.question_type.as_str(),
        "Question created"
    );

    Ok(created("Question created", QuestionResponse::from(question)))
}

async fn list_questions(
    CurrentAuthor(_user): CurrentAuthor,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QuestionListQuery>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<PaginatedResponse<QuestionResponse>> {
    let page = Page::from(page);
    let filter = QuestionFilter {
        author_id: query.author_id.as_deref(),
        question_type: query.question_type,
        search: query.search.as_deref(),
    };

    let questions =
        repositories::questions::list(state.db(), &filter, page.offset(), page.page_size)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total = repositories::questions::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    let items = questions.into_iter().map(QuestionResponse::from).collect();
    Ok(ok("Questions retrieved", PaginatedResponse::new(items, total, page)))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentAuthor(_user): CurrentAuthor,
    State(state): State<AppState>,
) -> ApiResult<QuestionResponse> {
    let question = fetch_question(&state, &question_id).await?;
    Ok(ok("Question retrieved", QuestionResponse::from(question)))
}

async fn update_question(
    Path(question_id): Path<String>,
    CurrentAuthor(user): CurrentAuthor,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<QuestionUpsert>,
) -> ApiResult<QuestionResponse> {
    let existing = fetch_question(&state, &question_id).await?;
    ensure_owner_or_admin(&user, &existing.author_id)?;

    let content = parse_content(&payload)?;

    let question = repositories::questions::update(
        state.db(),
        &question_id,
        fields(&payload, &content),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?
    .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(ok("Question updated", QuestionResponse::from(question)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentAuthor(user): CurrentAuthor,
    State(state): State<AppState>,
) -> ApiResult<()> {
    let existing = fetch_question(&state, &question_id).await?;
    ensure_owner_or_admin(&user, &existing.author_id)?;

    let referenced = repositories::questions::is_referenced(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check question usage"))?;
    if referenced {
        return Err(in_use());
    }

    let deleted = repositories::questions::delete_by_id(state.db(), &question_id)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                in_use()
            } else {
                ApiError::internal(e, "Failed to delete question")
            }
        })?;
    if !deleted {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    tracing::info!(question_id = %question_id, user_id = %user.id, "Question deleted");
    Ok(done("Question deleted"))
}

async fn fetch_question(state: &AppState, question_id: &str) -> Result<Question, ApiError> {
    repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))
}

fn parse_content(payload: &QuestionUpsert) -> Result<QuestionContent, ApiError> {
    QuestionContent::from_parts(payload.question_type, &payload.choices)
        .map_err(|err| ApiError::Validation(vec![format!("choices: {err}")]))
}

fn fields<'a>(payload: &'a QuestionUpsert, content: &QuestionContent) -> QuestionFields<'a> {
    QuestionFields {
        title: payload.title.trim(),
        body: &payload.body,
        question_type: content.question_type(),
        choices: content.to_json(),
        difficulty: payload.difficulty,
        tags: payload.normalized_tags(),
    }
}

fn in_use() -> ApiError {
    ApiError::Conflict("Question is used by an exam or submission".to_string())
}
