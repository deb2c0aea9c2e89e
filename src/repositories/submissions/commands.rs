use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

use super::types::{GradingSave, GradingWrite, COLUMNS};

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    exam_id: &str,
    user_id: &str,
    auto_graded: bool,
    now: PrimitiveDateTime,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, exam_id, user_id, started_at, total_score, status, auto_graded,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,0,$5,$6,$4,$4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(exam_id)
    .bind(user_id)
    .bind(now)
    .bind(SubmissionStatus::InProgress)
    .bind(auto_graded)
    .fetch_one(pool)
    .await
}

/// Replaces the submission's item set and result in one transaction.
///
/// The submission row is locked first, so two gradings of the same submission
/// run one after the other and the later commit wins with a complete set.
/// The exam row is then share-locked and its `updated_at` must still equal
/// `exam_updated_at`, the version the items were scored against; otherwise
/// nothing is written and [`GradingSave::ExamChanged`] is returned.
pub(crate) async fn save_grading(
    pool: &PgPool,
    submission_id: &str,
    exam_updated_at: PrimitiveDateTime,
    write: &GradingWrite,
    now: PrimitiveDateTime,
) -> Result<GradingSave, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let exam_id: Option<String> =
        sqlx::query_scalar("SELECT exam_id FROM submissions WHERE id = $1 FOR UPDATE")
            .bind(submission_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(exam_id) = exam_id else {
        return Ok(GradingSave::SubmissionMissing);
    };

    let current: Option<PrimitiveDateTime> =
        sqlx::query_scalar("SELECT updated_at FROM exams WHERE id = $1 FOR SHARE")
            .bind(&exam_id)
            .fetch_optional(&mut *tx)
            .await?;
    if current != Some(exam_updated_at) {
        return Ok(GradingSave::ExamChanged);
    }

    sqlx::query("DELETE FROM submission_items WHERE submission_id = $1")
        .bind(submission_id)
        .execute(&mut *tx)
        .await?;

    if !write.items.is_empty() {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO submission_items (
                id, submission_id, question_id, sequence, answer, awarded_points, is_correct, graded
             ) ",
        );
        builder.push_values(&write.items, |mut row, item| {
            row.push_bind(Uuid::new_v4().to_string())
                .push_bind(submission_id.to_string())
                .push_bind(item.question_id.clone())
                .push_bind(item.sequence)
                .push_bind(item.answer.clone().map(Json))
                .push_bind(item.awarded_points)
                .push_bind(item.is_correct)
                .push_bind(item.graded);
        });
        builder.build().execute(&mut *tx).await?;
    }

    let submission = sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET submitted_at = $1,
             duration_seconds = GREATEST(0, FLOOR(EXTRACT(EPOCH FROM ($1 - started_at))))::INTEGER,
             total_score = $2,
             status = $3,
             auto_graded = TRUE,
             result_summary = $4,
             updated_at = $1
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(now)
    .bind(write.total_score)
    .bind(SubmissionStatus::Completed)
    .bind(Json(&write.result_summary))
    .bind(submission_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(GradingSave::Saved(submission))
}
