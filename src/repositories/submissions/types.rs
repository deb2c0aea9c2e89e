use crate::db::models::{Submission, SubmissionHeader, SubmissionItemDetail};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, user_id, started_at, submitted_at, duration_seconds, total_score, \
    status, auto_graded, result_summary, created_at, updated_at";

/// One graded answer ready to be written to `submission_items`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewSubmissionItem {
    pub(crate) question_id: String,
    pub(crate) sequence: i32,
    pub(crate) answer: Option<serde_json::Value>,
    pub(crate) awarded_points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded: bool,
}

/// Everything a grading run replaces on the submission.
#[derive(Debug, Clone)]
pub(crate) struct GradingWrite {
    pub(crate) items: Vec<NewSubmissionItem>,
    pub(crate) total_score: f64,
    pub(crate) result_summary: serde_json::Value,
}

#[derive(Debug)]
pub(crate) enum GradingSave {
    Saved(Submission),
    SubmissionMissing,
    /// The exam was edited after it was read for scoring; nothing was written.
    ExamChanged,
}

#[derive(Debug)]
pub(crate) struct SubmissionDetails {
    pub(crate) header: SubmissionHeader,
    pub(crate) items: Vec<SubmissionItemDetail>,
}
