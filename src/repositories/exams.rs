use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use time::PrimitiveDateTime;

use crate::db::models::{Exam, ExamQuestionDetail};
use crate::repositories::questions::escape_like;

pub(crate) const COLUMNS: &str = "\
    id, course_id, title, description, duration_minutes, passing_score, \
    randomize_questions, created_by, is_published, created_at, updated_at";

pub(crate) struct ExamFields<'a> {
    pub(crate) course_id: Option<&'a str>,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_score: f64,
    pub(crate) randomize_questions: bool,
}

/// One exam-question link as written to `exam_questions`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionLink {
    pub(crate) question_id: String,
    pub(crate) points: f64,
    pub(crate) sequence: i32,
}

#[derive(Debug)]
pub(crate) struct ExamDetail {
    pub(crate) exam: Exam,
    pub(crate) questions: Vec<ExamQuestionDetail>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamListRow {
    #[sqlx(flatten)]
    pub(crate) exam: Exam,
    pub(crate) question_count: i64,
    pub(crate) total_points: f64,
    pub(crate) total_count: i64,
}

#[derive(Debug, Default)]
pub(crate) struct ExamListFilter<'a> {
    pub(crate) created_by: Option<&'a str>,
    pub(crate) search: Option<&'a str>,
    pub(crate) published_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteOutcome {
    Deleted,
    NotFound,
    HasSubmissions(i64),
}

/// Inserts the exam and its full link set in one transaction. A failing link
/// (unknown question, duplicate sequence) leaves no exam row behind.
pub(crate) async fn create_with_questions(
    pool: &PgPool,
    id: &str,
    created_by: &str,
    fields: ExamFields<'_>,
    links: &[QuestionLink],
    now: PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let exam = sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, course_id, title, description, duration_minutes, passing_score,
            randomize_questions, created_by, is_published, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,FALSE,$9,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(fields.course_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.duration_minutes)
    .bind(fields.passing_score)
    .bind(fields.randomize_questions)
    .bind(created_by)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    replace_questions(&mut tx, id, links).await?;
    tx.commit().await?;

    Ok(exam)
}

/// Rewrites the exam row and swaps its whole link set atomically. Returns
/// `None` without writing when the exam does not exist.
pub(crate) async fn update_with_questions(
    pool: &PgPool,
    id: &str,
    fields: ExamFields<'_>,
    links: &[QuestionLink],
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let exam = sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams
         SET course_id = $1,
             title = $2,
             description = $3,
             duration_minutes = $4,
             passing_score = $5,
             randomize_questions = $6,
             updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(fields.course_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.duration_minutes)
    .bind(fields.passing_score)
    .bind(fields.randomize_questions)
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(exam) = exam else {
        tx.rollback().await?;
        return Ok(None);
    };

    replace_questions(&mut tx, id, links).await?;
    tx.commit().await?;

    Ok(Some(exam))
}

/// Deletes every link of `exam_id` and inserts `links` in their place. Runs on
/// the caller's transaction so the swap is never observable half-done.
pub(crate) async fn replace_questions(
    tx: &mut Transaction<'_, Postgres>,
    exam_id: &str,
    links: &[QuestionLink],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exam_questions WHERE exam_id = $1")
        .bind(exam_id)
        .execute(&mut **tx)
        .await?;

    if links.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO exam_questions (exam_id, question_id, points, sequence) ",
    );
    builder.push_values(links, |mut row, link| {
        row.push_bind(exam_id.to_string())
            .push_bind(link.question_id.clone())
            .push_bind(link.points)
            .push_bind(link.sequence);
    });
    builder.build().execute(&mut **tx).await?;

    Ok(())
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<ExamQuestionDetail>, sqlx::Error> {
    sqlx::query_as::<_, ExamQuestionDetail>(
        "SELECT eq.question_id,
                eq.points,
                eq.sequence,
                q.title,
                q.body,
                q.question_type,
                q.choices,
                q.difficulty,
                q.tags
         FROM exam_questions eq
         JOIN questions q ON q.id = eq.question_id
         WHERE eq.exam_id = $1
         ORDER BY eq.sequence ASC",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_detail(pool: &PgPool, id: &str) -> Result<Option<ExamDetail>, sqlx::Error> {
    let Some(exam) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let questions = list_questions(pool, id).await?;
    Ok(Some(ExamDetail { exam, questions }))
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ExamListFilter<'_>) {
    if let Some(created_by) = filter.created_by {
        builder.push(" AND e.created_by = ");
        builder.push_bind(created_by.to_string());
    }

    if filter.published_only {
        builder.push(" AND e.is_published = TRUE");
    }

    if let Some(search) = filter.search.map(str::trim).filter(|value| !value.is_empty()) {
        builder.push(" AND e.title ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(search)));
    }
}

/// Newest first; rows sharing a `created_at` fall back to id order.
pub(crate) async fn list(
    pool: &PgPool,
    filter: &ExamListFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamListRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT e.id, e.course_id, e.title, e.description, e.duration_minutes,
                e.passing_score, e.randomize_questions, e.created_by, e.is_published,
                e.created_at, e.updated_at,
                COALESCE(stats.question_count, 0) AS question_count,
                COALESCE(stats.total_points, 0) AS total_points,
                COUNT(*) OVER() AS total_count
         FROM exams e
         LEFT JOIN (
            SELECT exam_id, COUNT(*) AS question_count, SUM(points) AS total_points
            FROM exam_questions
            GROUP BY exam_id
         ) stats ON stats.exam_id = e.id
         WHERE TRUE",
    );

    push_filters(&mut builder, filter);
    builder.push(" ORDER BY e.created_at DESC, e.id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ExamListRow>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &ExamListFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams e WHERE TRUE");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn set_published(
    pool: &PgPool,
    id: &str,
    published: bool,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET is_published = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(published)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_questions(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

/// Hard delete. Links and (with `force`) submissions go with the exam through
/// `ON DELETE CASCADE`; the row lock keeps new submissions out meanwhile.
pub(crate) async fn delete(
    pool: &PgPool,
    id: &str,
    force: bool,
) -> Result<DeleteOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let locked: Option<String> =
        sqlx::query_scalar("SELECT id FROM exams WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }

    let submissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE exam_id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if submissions > 0 && !force {
        return Ok(DeleteOutcome::HasSubmissions(submissions));
    }

    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(DeleteOutcome::Deleted)
}
