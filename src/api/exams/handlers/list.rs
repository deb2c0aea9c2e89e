use axum::extract::{Path, State};

use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{Page, PaginatedResponse};
use crate::api::response::{ok, ApiResult};
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::exams::ExamListFilter;
use crate::schemas::exam::{ExamDetailResponse, ExamResponse, ExamSummaryResponse};
use crate::schemas::PageParams;

use super::super::helpers;
use super::super::queries::ListExamsQuery;

/// Drafts are listed for admins, and for teachers filtering on their own id.
/// Everyone else only sees published exams.
pub(in crate::api::exams) async fn list_exams(
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
    ApiQuery(params): ApiQuery<ListExamsQuery>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<PaginatedResponse<ExamSummaryResponse>> {
    let page = Page::from(page);
    let created_by = params.created_by.as_deref().map(str::trim).filter(|id| !id.is_empty());

    let published_only = match user.role {
        UserRole::Admin => false,
        UserRole::Teacher => created_by != Some(user.id.as_str()),
        UserRole::Student => true,
    };

    let filter = ExamListFilter { created_by, search: params.search.as_deref(), published_only };
    let rows = repositories::exams::list(state.db(), &filter, page.offset(), page.page_size)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    // Past the last page the window count has no row to ride on.
    let total_count = match rows.first() {
        Some(row) => row.total_count,
        None => repositories::exams::count(state.db(), &filter)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count exams"))?,
    };
    let items = rows
        .into_iter()
        .map(|row| ExamSummaryResponse {
            exam: ExamResponse::from(row.exam),
            question_count: row.question_count,
            total_points: row.total_points,
        })
        .collect();

    Ok(ok("Exams retrieved", PaginatedResponse::new(items, total_count, page)))
}

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    state: State<AppState>,
) -> ApiResult<ExamDetailResponse> {
    let detail = repositories::exams::find_detail(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(helpers::not_found)?;

    let manager = helpers::can_manage(&user, &detail.exam);
    if !manager && !detail.exam.is_published {
        return Err(helpers::not_found());
    }

    Ok(ok("Exam retrieved", helpers::detail_response(detail, manager)))
}
