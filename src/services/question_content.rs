//! Typed view of a question's `(question_type, choices)` pair.
//!
//! The database keeps choices as JSONB; everything that reads or writes them
//! goes through [`QuestionContent::from_parts`] so a row whose shape does not
//! match its type never reaches grading.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db::types::QuestionType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChoiceOption {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) media_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ClozeBlank {
    pub(crate) id: String,
    pub(crate) accepted: Vec<String>,
    #[serde(default)]
    pub(crate) case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Cloze {
    pub(crate) text: String,
    pub(crate) blanks: Vec<ClozeBlank>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ShortAnswer {
    pub(crate) accepted_answers: Vec<String>,
    #[serde(default)]
    pub(crate) case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QuestionContent {
    SingleChoice(Vec<ChoiceOption>),
    MultipleChoice(Vec<ChoiceOption>),
    TrueFalse(Vec<ChoiceOption>),
    TrueFalseNotGiven(Vec<ChoiceOption>),
    ImageChoice(Vec<ChoiceOption>),
    AudioChoice(Vec<ChoiceOption>),
    ClozeSingle(Cloze),
    ClozeMultiple(Cloze),
    ShortAnswer(ShortAnswer),
}

#[derive(Debug, Error)]
pub(crate) enum QuestionContentError {
    #[error("choices do not match {question_type}: {source}")]
    Malformed {
        question_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{question_type} needs at least {min} options, got {found}")]
    TooFewOptions { question_type: &'static str, min: usize, found: usize },
    #[error("{question_type} needs exactly {expected} options, got {found}")]
    OptionCount { question_type: &'static str, expected: usize, found: usize },
    #[error("{question_type} needs {expected} correct option(s), got {found}")]
    CorrectCount { question_type: &'static str, expected: &'static str, found: usize },
    #[error("{question_type} needs {expected} blank(s), got {found}")]
    BlankCount { question_type: &'static str, expected: &'static str, found: usize },
    #[error("ids must not be empty")]
    EmptyId,
    #[error("duplicate id {0:?}")]
    DuplicateId(String),
    #[error("option {0:?} needs a media_url")]
    MissingMedia(String),
    #[error("{0} needs at least one non-blank accepted answer")]
    NoAcceptedAnswers(String),
}

impl QuestionContent {
    /// Parses and validates `choices` for `question_type`.
    pub(crate) fn from_parts(
        question_type: QuestionType,
        choices: &Value,
    ) -> Result<Self, QuestionContentError> {
        let content = match question_type {
            QuestionType::SingleChoice => Self::SingleChoice(parse(question_type, choices)?),
            QuestionType::MultipleChoice => Self::MultipleChoice(parse(question_type, choices)?),
            QuestionType::TrueFalse => Self::TrueFalse(parse(question_type, choices)?),
            QuestionType::TrueFalseNotGiven => {
                Self::TrueFalseNotGiven(parse(question_type, choices)?)
            }
            QuestionType::ImageChoice => Self::ImageChoice(parse(question_type, choices)?),
            QuestionType::AudioChoice => Self::AudioChoice(parse(question_type, choices)?),
            QuestionType::ClozeSingle => Self::ClozeSingle(parse(question_type, choices)?),
            QuestionType::ClozeMultiple => Self::ClozeMultiple(parse(question_type, choices)?),
            QuestionType::ShortAnswer => Self::ShortAnswer(parse(question_type, choices)?),
        };
        content.validate()?;
        Ok(content)
    }

    pub(crate) fn question_type(&self) -> QuestionType {
        match self {
            Self::SingleChoice(_) => QuestionType::SingleChoice,
            Self::MultipleChoice(_) => QuestionType::MultipleChoice,
            Self::TrueFalse(_) => QuestionType::TrueFalse,
            Self::TrueFalseNotGiven(_) => QuestionType::TrueFalseNotGiven,
            Self::ImageChoice(_) => QuestionType::ImageChoice,
            Self::AudioChoice(_) => QuestionType::AudioChoice,
            Self::ClozeSingle(_) => QuestionType::ClozeSingle,
            Self::ClozeMultiple(_) => QuestionType::ClozeMultiple,
            Self::ShortAnswer(_) => QuestionType::ShortAnswer,
        }
    }

    pub(crate) fn options(&self) -> Option<&[ChoiceOption]> {
        match self {
            Self::SingleChoice(options)
            | Self::MultipleChoice(options)
            | Self::TrueFalse(options)
            | Self::TrueFalseNotGiven(options)
            | Self::ImageChoice(options)
            | Self::AudioChoice(options) => Some(options),
            Self::ClozeSingle(_) | Self::ClozeMultiple(_) | Self::ShortAnswer(_) => None,
        }
    }

    /// Canonical JSON for storage and for authors.
    pub(crate) fn to_json(&self) -> Value {
        let encoded = match self {
            Self::ClozeSingle(cloze) | Self::ClozeMultiple(cloze) => serde_json::to_value(cloze),
            Self::ShortAnswer(short) => serde_json::to_value(short),
            _ => serde_json::to_value(self.options().unwrap_or_default()),
        };
        encoded.unwrap_or(Value::Null)
    }

    /// Choices as shown to test takers: no correctness flags, no accepted
    /// answers.
    pub(crate) fn redacted_json(&self) -> Value {
        match self {
            Self::ClozeSingle(cloze) | Self::ClozeMultiple(cloze) => json!({
                "text": cloze.text,
                "blanks": cloze.blanks.iter().map(|blank| json!({ "id": blank.id })).collect::<Vec<_>>(),
            }),
            Self::ShortAnswer(_) => json!({}),
            _ => Value::Array(
                self.options()
                    .unwrap_or_default()
                    .iter()
                    .map(|option| {
                        let mut value = json!({ "id": option.id, "text": option.text });
                        if let Some(media_url) = &option.media_url {
                            value["media_url"] = Value::String(media_url.clone());
                        }
                        value
                    })
                    .collect(),
            ),
        }
    }

    fn validate(&self) -> Result<(), QuestionContentError> {
        let question_type = self.question_type().as_str();
        match self {
            Self::ClozeSingle(cloze) => validate_cloze(question_type, cloze, Some(1)),
            Self::ClozeMultiple(cloze) => validate_cloze(question_type, cloze, None),
            Self::ShortAnswer(short) => {
                if has_accepted(&short.accepted_answers) {
                    Ok(())
                } else {
                    Err(QuestionContentError::NoAcceptedAnswers(question_type.to_string()))
                }
            }
            Self::SingleChoice(options)
            | Self::MultipleChoice(options)
            | Self::TrueFalse(options)
            | Self::TrueFalseNotGiven(options)
            | Self::ImageChoice(options)
            | Self::AudioChoice(options) => validate_options(self, question_type, options),
        }
    }
}

fn parse<T: DeserializeOwned>(
    question_type: QuestionType,
    choices: &Value,
) -> Result<T, QuestionContentError> {
    T::deserialize(choices).map_err(|source| QuestionContentError::Malformed {
        question_type: question_type.as_str(),
        source,
    })
}

fn validate_options(
    content: &QuestionContent,
    question_type: &'static str,
    options: &[ChoiceOption],
) -> Result<(), QuestionContentError> {
    let exact = match content {
        QuestionContent::TrueFalse(_) => Some(2),
        QuestionContent::TrueFalseNotGiven(_) => Some(3),
        _ => None,
    };
    match exact {
        Some(expected) if options.len() != expected => {
            return Err(QuestionContentError::OptionCount {
                question_type,
                expected,
                found: options.len(),
            });
        }
        None if options.len() < 2 => {
            return Err(QuestionContentError::TooFewOptions {
                question_type,
                min: 2,
                found: options.len(),
            });
        }
        _ => {}
    }

    ensure_unique_ids(options.iter().map(|option| option.id.as_str()))?;

    let correct = options.iter().filter(|option| option.is_correct).count();
    let (valid, expected) = match content {
        QuestionContent::MultipleChoice(_) => (correct >= 1, "at least 1"),
        _ => (correct == 1, "exactly 1"),
    };
    if !valid {
        return Err(QuestionContentError::CorrectCount { question_type, expected, found: correct });
    }

    if matches!(content, QuestionContent::ImageChoice(_) | QuestionContent::AudioChoice(_)) {
        if let Some(option) = options
            .iter()
            .find(|option| option.media_url.as_deref().map_or(true, |url| url.trim().is_empty()))
        {
            return Err(QuestionContentError::MissingMedia(option.id.clone()));
        }
    }

    Ok(())
}

fn validate_cloze(
    question_type: &'static str,
    cloze: &Cloze,
    exact: Option<usize>,
) -> Result<(), QuestionContentError> {
    let found = cloze.blanks.len();
    match exact {
        Some(expected) if found != expected => {
            return Err(QuestionContentError::BlankCount { question_type, expected: "exactly 1", found });
        }
        None if found == 0 => {
            return Err(QuestionContentError::BlankCount { question_type, expected: "at least 1", found });
        }
        _ => {}
    }

    ensure_unique_ids(cloze.blanks.iter().map(|blank| blank.id.as_str()))?;

    match cloze.blanks.iter().find(|blank| !has_accepted(&blank.accepted)) {
        Some(blank) => Err(QuestionContentError::NoAcceptedAnswers(format!("blank {:?}", blank.id))),
        None => Ok(()),
    }
}

fn ensure_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), QuestionContentError> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(QuestionContentError::EmptyId);
        }
        if !seen.insert(id) {
            return Err(QuestionContentError::DuplicateId(id.to_string()));
        }
    }
    Ok(())
}

fn has_accepted(answers: &[String]) -> bool {
    answers.iter().any(|answer| !answer.trim().is_empty())
}
