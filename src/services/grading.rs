use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;

use crate::core::metrics;
use crate::core::time::primitive_now_utc;
use crate::db::models::{ExamQuestionDetail, Submission, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::submissions::{GradingSave, GradingWrite, NewSubmissionItem};
use crate::services::notifications::{self, Notifier};
use crate::services::question_content::{QuestionContent, QuestionContentError};
use crate::services::scoring::{self, ItemScore, ResultSummary};

/// Rescoring rounds allowed when the exam is edited mid-grading.
const MAX_GRADING_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct SubmittedAnswer {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) answer: Option<Value>,
}

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("submission not found")]
    SubmissionNotFound,
    #[error("exam not found")]
    ExamNotFound,
    #[error("not allowed to grade this submission")]
    Forbidden,
    #[error("duplicate answer for question {0}")]
    DuplicateAnswer(String),
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(String),
    #[error("question {question_id} has invalid stored choices: {source}")]
    InvalidQuestion {
        question_id: String,
        #[source]
        source: QuestionContentError,
    },
    #[error("exam kept changing while the submission was being graded")]
    ExamChanged,
    #[error("failed to encode result summary: {0}")]
    SummaryEncoding(#[source] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl GradingError {
    fn outcome_label(&self) -> &'static str {
        match self {
            Self::SubmissionNotFound | Self::ExamNotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::DuplicateAnswer(_) | Self::UnknownQuestion(_) => "invalid",
            Self::ExamChanged => "conflict",
            Self::InvalidQuestion { .. } | Self::SummaryEncoding(_) | Self::Database(_) => {
                "error"
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct GradingOutcome {
    pub(crate) submission: Submission,
    pub(crate) summary: ResultSummary,
    pub(crate) items: Vec<NewSubmissionItem>,
}

/// Grades `submission_id` with `answers` and persists the result in one
/// transaction, replacing any earlier grading. The graded notification is sent
/// after commit and its failure is only logged.
pub(crate) async fn grade_submission(
    pool: &PgPool,
    notifier: &dyn Notifier,
    actor: &User,
    submission_id: &str,
    answers: &[SubmittedAnswer],
) -> Result<GradingOutcome, GradingError> {
    let started = Instant::now();
    let result = grade_and_persist(pool, actor, submission_id, answers).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok((outcome, exam_title)) => {
            metrics::record_grading("ok", elapsed);
            tracing::info!(
                submission_id,
                total_score = outcome.summary.total_score,
                passed = outcome.summary.passed,
                "Submission graded"
            );

            let event = notifications::submission_graded(
                &outcome.submission.user_id,
                &outcome.submission.id,
                &outcome.submission.exam_id,
                &exam_title,
                &outcome.summary,
            );
            notifications::notify_best_effort(notifier, event).await;

            Ok(outcome)
        }
        Err(err) => {
            metrics::record_grading(err.outcome_label(), elapsed);
            Err(err)
        }
    }
}

async fn grade_and_persist(
    pool: &PgPool,
    actor: &User,
    submission_id: &str,
    answers: &[SubmittedAnswer],
) -> Result<(GradingOutcome, String), GradingError> {
    let submission = repositories::submissions::find_by_id(pool, submission_id)
        .await?
        .ok_or(GradingError::SubmissionNotFound)?;

    if submission.user_id != actor.id && actor.role != UserRole::Admin {
        return Err(GradingError::Forbidden);
    }

    // Scoring happens outside the write transaction; `save_grading` refuses the
    // write if the exam moved on since `detail` was read, and we rescore.
    for attempt in 1..=MAX_GRADING_ATTEMPTS {
        let detail = repositories::exams::find_detail(pool, &submission.exam_id)
            .await?
            .ok_or(GradingError::ExamNotFound)?;

        let (write, summary) =
            compute_grading(&detail.questions, answers, detail.exam.passing_score)?;

        let saved = repositories::submissions::save_grading(
            pool,
            submission_id,
            detail.exam.updated_at,
            &write,
            primitive_now_utc(),
        )
        .await?;

        match saved {
            GradingSave::Saved(submission) => {
                let outcome = GradingOutcome { submission, summary, items: write.items };
                return Ok((outcome, detail.exam.title));
            }
            GradingSave::SubmissionMissing => return Err(GradingError::SubmissionNotFound),
            GradingSave::ExamChanged => {
                tracing::debug!(submission_id, attempt, "Exam changed during grading; rescoring");
            }
        }
    }

    Err(GradingError::ExamChanged)
}

/// Pure part of grading: validates the answer set against the exam's links
/// and scores every link in sequence order.
pub(crate) fn compute_grading(
    questions: &[ExamQuestionDetail],
    answers: &[SubmittedAnswer],
    passing_score: f64,
) -> Result<(GradingWrite, ResultSummary), GradingError> {
    let known: HashSet<&str> = questions.iter().map(|q| q.question_id.as_str()).collect();
    let mut by_question: HashMap<&str, Option<&Value>> = HashMap::with_capacity(answers.len());

    for answer in answers {
        let question_id = answer.question_id.as_str();
        if !known.contains(question_id) {
            return Err(GradingError::UnknownQuestion(answer.question_id.clone()));
        }
        if by_question.insert(question_id, answer.answer.as_ref()).is_some() {
            return Err(GradingError::DuplicateAnswer(answer.question_id.clone()));
        }
    }

    let mut ordered: Vec<&ExamQuestionDetail> = questions.iter().collect();
    ordered.sort_by_key(|question| question.sequence);

    let mut items = Vec::with_capacity(ordered.len());
    let mut scores: Vec<ItemScore> = Vec::with_capacity(ordered.len());
    let mut max_score = 0.0;

    for question in ordered {
        let content = QuestionContent::from_parts(question.question_type, &question.choices.0)
            .map_err(|source| GradingError::InvalidQuestion {
                question_id: question.question_id.clone(),
                source,
            })?;

        let answer = by_question.get(question.question_id.as_str()).copied().flatten();
        let score = scoring::score_answer(&content, answer, question.points);
        max_score += question.points;

        items.push(NewSubmissionItem {
            question_id: question.question_id.clone(),
            sequence: question.sequence,
            answer: answer.filter(|value| !value.is_null()).cloned(),
            awarded_points: score.awarded_points,
            is_correct: score.is_correct,
            graded: score.graded,
        });
        scores.push(score);
    }

    let summary = scoring::summarize(&scores, max_score, passing_score);
    let result_summary =
        serde_json::to_value(&summary).map_err(GradingError::SummaryEncoding)?;

    Ok((GradingWrite { items, total_score: summary.total_score, result_summary }, summary))
}
