use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Question;
use crate::db::types::{DifficultyLevel, QuestionType};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpsert {
    #[validate(custom(function = super::validate_title))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) body: String,
    #[serde(rename = "type", alias = "question_type", alias = "questionType")]
    pub(crate) question_type: QuestionType,
    pub(crate) choices: serde_json::Value,
    #[serde(default)]
    pub(crate) difficulty: DifficultyLevel,
    #[serde(default)]
    #[validate(length(max = 32, message = "at most 32 tags"))]
    pub(crate) tags: Vec<String>,
}

impl QuestionUpsert {
    /// Trimmed, de-duplicated, order-preserving tag list.
    pub(crate) fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionListQuery {
    #[serde(default, alias = "authorId")]
    pub(crate) author_id: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(crate) search: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) author_id: String,
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) choices: serde_json::Value,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            author_id: question.author_id,
            title: question.title,
            body: question.body,
            question_type: question.question_type,
            choices: question.choices.0,
            difficulty: question.difficulty,
            tags: question.tags.0,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}
