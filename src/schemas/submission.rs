use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::{Submission, SubmissionItemDetail, SubmissionListRow};
use crate::db::types::{QuestionType, SubmissionStatus};
use crate::repositories::submissions::SubmissionDetails;
use crate::services::grading::{GradingOutcome, SubmittedAnswer};
use crate::services::scoring::ResultSummary;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionCreate {
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[validate(length(max = 500, message = "at most 500 answers"))]
    pub(crate) answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionListQuery {
    #[serde(default, alias = "userId")]
    pub(crate) user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) duration_seconds: Option<i32>,
    pub(crate) total_score: f64,
    pub(crate) auto_graded: bool,
    pub(crate) result_summary: Option<serde_json::Value>,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.id,
            exam_id: submission.exam_id,
            user_id: submission.user_id,
            status: submission.status,
            started_at: format_primitive(submission.started_at),
            submitted_at: format_optional(submission.submitted_at),
            duration_seconds: submission.duration_seconds,
            total_score: submission.total_score,
            auto_graded: submission.auto_graded,
            result_summary: submission.result_summary.map(|summary| summary.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GradedItemResponse {
    pub(crate) question_id: String,
    pub(crate) sequence: i32,
    pub(crate) awarded_points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) submission: SubmissionResponse,
    pub(crate) summary: ResultSummary,
    pub(crate) items: Vec<GradedItemResponse>,
}

impl From<GradingOutcome> for GradeResponse {
    fn from(outcome: GradingOutcome) -> Self {
        Self {
            submission: outcome.submission.into(),
            summary: outcome.summary,
            items: outcome
                .items
                .into_iter()
                .map(|item| GradedItemResponse {
                    question_id: item.question_id,
                    sequence: item.sequence,
                    awarded_points: item.awarded_points,
                    is_correct: item.is_correct,
                    graded: item.graded,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListItem {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) user_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) duration_seconds: Option<i32>,
    pub(crate) total_score: f64,
}

impl From<SubmissionListRow> for SubmissionListItem {
    fn from(row: SubmissionListRow) -> Self {
        Self {
            id: row.id,
            exam_id: row.exam_id,
            exam_title: row.exam_title,
            user_id: row.user_id,
            status: row.status,
            started_at: format_primitive(row.started_at),
            submitted_at: format_optional(row.submitted_at),
            duration_seconds: row.duration_seconds,
            total_score: row.total_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionItemResponse {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) sequence: i32,
    pub(crate) answer: Option<serde_json::Value>,
    pub(crate) awarded_points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded: bool,
    pub(crate) points: Option<f64>,
    pub(crate) question_title: String,
    pub(crate) question_body: String,
    pub(crate) question_type: QuestionType,
    pub(crate) choices: serde_json::Value,
    pub(crate) tags: Vec<String>,
}

impl From<SubmissionItemDetail> for SubmissionItemResponse {
    fn from(item: SubmissionItemDetail) -> Self {
        Self {
            id: item.id,
            question_id: item.question_id,
            sequence: item.sequence,
            answer: item.answer.map(|answer| answer.0),
            awarded_points: item.awarded_points,
            is_correct: item.is_correct,
            graded: item.graded,
            points: item.points,
            question_title: item.title,
            question_body: item.body,
            question_type: item.question_type,
            choices: item.choices.0,
            tags: item.tags.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionDetailResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) exam_passing_score: f64,
    pub(crate) exam_duration_minutes: i32,
    pub(crate) user_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) duration_seconds: Option<i32>,
    pub(crate) total_score: f64,
    pub(crate) auto_graded: bool,
    pub(crate) result_summary: Option<serde_json::Value>,
    pub(crate) items: Vec<SubmissionItemResponse>,
}

impl From<SubmissionDetails> for SubmissionDetailResponse {
    fn from(details: SubmissionDetails) -> Self {
        let header = details.header;
        Self {
            id: header.id,
            exam_id: header.exam_id,
            exam_title: header.exam_title,
            exam_passing_score: header.exam_passing_score,
            exam_duration_minutes: header.exam_duration_minutes,
            user_id: header.user_id,
            status: header.status,
            started_at: format_primitive(header.started_at),
            submitted_at: format_optional(header.submitted_at),
            duration_seconds: header.duration_seconds,
            total_score: header.total_score,
            auto_graded: header.auto_graded,
            result_summary: header.result_summary.map(|summary| summary.0),
            items: details.items.into_iter().map(SubmissionItemResponse::from).collect(),
        }
    }
}
