use sqlx::PgPool;

use crate::db::models::{Submission, SubmissionHeader, SubmissionItemDetail, SubmissionListRow};

use super::types::{SubmissionDetails, COLUMNS};

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Newest first; rows sharing a `created_at` fall back to id order.
pub(crate) async fn list_by_user(
    pool: &PgPool,
    user_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<SubmissionListRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionListRow>(
        "SELECT s.id,
                s.exam_id,
                e.title AS exam_title,
                s.user_id,
                s.started_at,
                s.submitted_at,
                s.duration_seconds,
                s.total_score,
                s.status
         FROM submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.user_id = $1
         ORDER BY s.created_at DESC, s.id
         OFFSET $2 LIMIT $3",
    )
    .bind(user_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_user(pool: &PgPool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Submission with exam context and every item joined with its question and
/// exam link, ordered by sequence. Links are LEFT-joined: an exam edited after
/// grading may no longer contain a graded question.
pub(crate) async fn find_details(
    pool: &PgPool,
    id: &str,
) -> Result<Option<SubmissionDetails>, sqlx::Error> {
    let header = sqlx::query_as::<_, SubmissionHeader>(
        "SELECT s.id,
                s.exam_id,
                s.user_id,
                s.started_at,
                s.submitted_at,
                s.duration_seconds,
                s.total_score,
                s.status,
                s.auto_graded,
                s.result_summary,
                e.title AS exam_title,
                e.passing_score AS exam_passing_score,
                e.duration_minutes AS exam_duration_minutes
         FROM submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(header) = header else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, SubmissionItemDetail>(
        "SELECT si.id,
                si.question_id,
                si.sequence,
                si.answer,
                si.awarded_points,
                si.is_correct,
                si.graded,
                q.title,
                q.body,
                q.question_type,
                q.choices,
                q.tags,
                eq.points,
                eq.sequence AS link_sequence
         FROM submission_items si
         JOIN questions q ON q.id = si.question_id
         LEFT JOIN exam_questions eq
                ON eq.exam_id = $2 AND eq.question_id = si.question_id
         WHERE si.submission_id = $1
         ORDER BY si.sequence ASC",
    )
    .bind(id)
    .bind(&header.exam_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(SubmissionDetails { header, items }))
}
