use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamQuestionDetail};
use crate::db::types::{DifficultyLevel, QuestionType};
use crate::repositories::exams::QuestionLink;

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_links"))]
pub(crate) struct ExamUpsert {
    #[serde(default, alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[validate(custom(function = super::validate_title))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, max = 1440, message = "duration_minutes must be 1..1440"))]
    pub(crate) duration_minutes: i32,
    #[serde(default, alias = "passingScore")]
    #[validate(range(min = 0.0, message = "passing_score must be non-negative"))]
    pub(crate) passing_score: f64,
    #[serde(default, alias = "randomizeQuestions")]
    pub(crate) randomize_questions: bool,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<ExamQuestionInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamQuestionInput {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[validate(range(min = 0.0, message = "points must be non-negative"))]
    pub(crate) points: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "sequence must be non-negative"))]
    pub(crate) sequence: Option<i32>,
}

impl ExamUpsert {
    /// Links with sequence defaulting to the list position.
    pub(crate) fn links(&self) -> Vec<QuestionLink> {
        self.questions
            .iter()
            .enumerate()
            .map(|(position, question)| QuestionLink {
                question_id: question.question_id.clone(),
                points: question.points,
                sequence: question.sequence.unwrap_or(position as i32),
            })
            .collect()
    }
}

fn validate_links(exam: &ExamUpsert) -> Result<(), ValidationError> {
    let mut questions = HashSet::new();
    let mut sequences = HashSet::new();

    for link in exam.links() {
        if !questions.insert(link.question_id) {
            return Err(ValidationError::new("duplicate_question")
                .with_message("a question may appear only once per exam".into()));
        }
        if !sequences.insert(link.sequence) {
            return Err(ValidationError::new("duplicate_sequence")
                .with_message("sequence numbers must be unique within an exam".into()));
        }
    }

    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PublishRequest {
    pub(crate) published: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) course_id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_score: f64,
    pub(crate) randomize_questions: bool,
    pub(crate) created_by: String,
    pub(crate) is_published: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        Self {
            id: exam.id,
            course_id: exam.course_id,
            title: exam.title,
            description: exam.description,
            duration_minutes: exam.duration_minutes,
            passing_score: exam.passing_score,
            randomize_questions: exam.randomize_questions,
            created_by: exam.created_by,
            is_published: exam.is_published,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) question_count: i64,
    pub(crate) total_points: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamQuestionResponse {
    pub(crate) question_id: String,
    pub(crate) sequence: i32,
    pub(crate) points: f64,
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) choices: serde_json::Value,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) tags: Vec<String>,
}

impl ExamQuestionResponse {
    pub(crate) fn from_detail(detail: ExamQuestionDetail, choices: serde_json::Value) -> Self {
        Self {
            question_id: detail.question_id,
            sequence: detail.sequence,
            points: detail.points,
            title: detail.title,
            body: detail.body,
            question_type: detail.question_type,
            choices,
            difficulty: detail.difficulty,
            tags: detail.tags.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDetailResponse {
    #[serde(flatten)]
    pub(crate) exam: ExamResponse,
    pub(crate) total_points: f64,
    pub(crate) questions: Vec<ExamQuestionResponse>,
}
