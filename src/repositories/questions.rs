use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::{DifficultyLevel, QuestionType};

pub(crate) const COLUMNS: &str = "\
    id, author_id, title, body, question_type, choices, difficulty, tags, created_at, updated_at";

pub(crate) struct QuestionFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) body: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) choices: serde_json::Value,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct QuestionFilter<'a> {
    pub(crate) author_id: Option<&'a str>,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) search: Option<&'a str>,
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    author_id: &str,
    fields: QuestionFields<'_>,
    now: PrimitiveDateTime,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, author_id, title, body, question_type, choices, difficulty, tags,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(author_id)
    .bind(fields.title)
    .bind(fields.body)
    .bind(fields.question_type)
    .bind(Json(fields.choices))
    .bind(fields.difficulty)
    .bind(Json(fields.tags))
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Ids from `ids` that have no question row.
pub(crate) async fn missing_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<String>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar(
        "SELECT wanted.id
         FROM UNNEST($1::varchar[]) AS wanted(id)
         LEFT JOIN questions q ON q.id = wanted.id
         WHERE q.id IS NULL",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    fields: QuestionFields<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions
         SET title = $1,
             body = $2,
             question_type = $3,
             choices = $4,
             difficulty = $5,
             tags = $6,
             updated_at = $7
         WHERE id = $8
         RETURNING {COLUMNS}"
    ))
    .bind(fields.title)
    .bind(fields.body)
    .bind(fields.question_type)
    .bind(Json(fields.choices))
    .bind(fields.difficulty)
    .bind(Json(fields.tags))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter<'_>) {
    builder.push(" WHERE TRUE");

    if let Some(author_id) = filter.author_id {
        builder.push(" AND author_id = ");
        builder.push_bind(author_id.to_string());
    }

    if let Some(question_type) = filter.question_type {
        builder.push(" AND question_type = ");
        builder.push_bind(question_type);
    }

    if let Some(search) = filter.search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR body ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &QuestionFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questions"));
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &QuestionFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn is_referenced(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM exam_questions WHERE question_id = $1)
             OR EXISTS (SELECT 1 FROM submission_items WHERE question_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Returns whether a row was removed. Referenced questions are protected by
/// `ON DELETE RESTRICT`, which surfaces as a foreign-key violation.
pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
