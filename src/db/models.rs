use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{DifficultyLevel, QuestionType, SubmissionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) author_id: String,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) question_type: QuestionType,
    pub(crate) choices: Json<serde_json::Value>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) tags: Json<Vec<String>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) course_id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_score: f64,
    pub(crate) randomize_questions: bool,
    pub(crate) created_by: String,
    pub(crate) is_published: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// An exam-question link joined with the question it points at.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamQuestionDetail {
    pub(crate) question_id: String,
    pub(crate) points: f64,
    pub(crate) sequence: i32,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) question_type: QuestionType,
    pub(crate) choices: Json<serde_json::Value>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) tags: Json<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) duration_seconds: Option<i32>,
    pub(crate) total_score: f64,
    pub(crate) status: SubmissionStatus,
    pub(crate) auto_graded: bool,
    pub(crate) result_summary: Option<Json<serde_json::Value>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Row of the paged history: submission plus the exam title.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubmissionListRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) user_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) duration_seconds: Option<i32>,
    pub(crate) total_score: f64,
    pub(crate) status: SubmissionStatus,
}

/// Submission header joined with the exam fields shown in the result view.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubmissionHeader {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) duration_seconds: Option<i32>,
    pub(crate) total_score: f64,
    pub(crate) status: SubmissionStatus,
    pub(crate) auto_graded: bool,
    pub(crate) result_summary: Option<Json<serde_json::Value>>,
    pub(crate) exam_title: String,
    pub(crate) exam_passing_score: f64,
    pub(crate) exam_duration_minutes: i32,
}

/// Submission item joined with its question and the exam link.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubmissionItemDetail {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) sequence: i32,
    pub(crate) answer: Option<Json<serde_json::Value>>,
    pub(crate) awarded_points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded: bool,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) question_type: QuestionType,
    pub(crate) choices: Json<serde_json::Value>,
    pub(crate) tags: Json<Vec<String>>,
    pub(crate) points: Option<f64>,
    pub(crate) link_sequence: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Notification {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) kind: String,
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) payload: Json<serde_json::Value>,
    pub(crate) is_read: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) read_at: Option<PrimitiveDateTime>,
}
