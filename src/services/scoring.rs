use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::question_content::{Cloze, ClozeBlank, QuestionContent, ShortAnswer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ItemScore {
    pub(crate) awarded_points: f64,
    pub(crate) is_correct: bool,
    pub(crate) graded: bool,
}

/// Aggregate stored in `submissions.result_summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ResultSummary {
    pub(crate) correct_count: u32,
    pub(crate) wrong_count: u32,
    pub(crate) unanswered_count: u32,
    pub(crate) total_questions: u32,
    pub(crate) total_score: f64,
    pub(crate) max_score: f64,
    pub(crate) passing_score: f64,
    pub(crate) passed: bool,
}

/// Scores one answer against `content`. All-or-nothing: the full `points` for
/// a correct answer, zero otherwise. Absent and `null` answers are left
/// ungraded; a present answer of the wrong shape is graded incorrect.
pub(crate) fn score_answer(content: &QuestionContent, answer: Option<&Value>, points: f64) -> ItemScore {
    let Some(answer) = answer.filter(|value| !value.is_null()) else {
        return ItemScore { awarded_points: 0.0, is_correct: false, graded: false };
    };

    let is_correct = match content {
        QuestionContent::ClozeSingle(cloze) | QuestionContent::ClozeMultiple(cloze) => {
            cloze_matches(cloze, answer)
        }
        QuestionContent::ShortAnswer(short) => short_answer_matches(short, answer),
        _ => choice_matches(content, answer),
    };

    ItemScore { awarded_points: if is_correct { points } else { 0.0 }, is_correct, graded: true }
}

pub(crate) fn summarize(scores: &[ItemScore], max_score: f64, passing_score: f64) -> ResultSummary {
    let total_questions = saturating_count(scores.len());
    let correct_count = saturating_count(scores.iter().filter(|score| score.is_correct).count());
    let unanswered_count = saturating_count(scores.iter().filter(|score| !score.graded).count());
    let total_score: f64 = scores.iter().map(|score| score.awarded_points).sum();

    ResultSummary {
        correct_count,
        wrong_count: total_questions.saturating_sub(correct_count),
        unanswered_count,
        total_questions,
        total_score,
        max_score,
        passing_score,
        passed: total_score >= passing_score,
    }
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Trims, collapses whitespace runs to one space and, unless
/// `case_sensitive`, lowercases.
pub(crate) fn normalize_text(value: &str, case_sensitive: bool) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

fn text_matches(candidate: &str, accepted: &[String], case_sensitive: bool) -> bool {
    let candidate = normalize_text(candidate, case_sensitive);
    !candidate.is_empty()
        && accepted.iter().any(|expected| normalize_text(expected, case_sensitive) == candidate)
}

fn choice_matches(content: &QuestionContent, answer: &Value) -> bool {
    let Some(selected) = selected_ids(answer) else {
        return false;
    };
    let correct: BTreeSet<&str> = content
        .options()
        .unwrap_or_default()
        .iter()
        .filter(|option| option.is_correct)
        .map(|option| option.id.as_str())
        .collect();
    selected == correct
}

fn selected_ids(answer: &Value) -> Option<BTreeSet<&str>> {
    match answer {
        Value::String(id) => Some(BTreeSet::from([id.as_str()])),
        Value::Array(items) => items.iter().map(Value::as_str).collect(),
        _ => None,
    }
}

fn cloze_matches(cloze: &Cloze, answer: &Value) -> bool {
    let blank_matches =
        |blank: &ClozeBlank, value: Option<&Value>| match value.and_then(Value::as_str) {
            Some(text) => text_matches(text, &blank.accepted, blank.case_sensitive),
            None => false,
        };

    match answer {
        Value::Object(by_id) => {
            cloze.blanks.iter().all(|blank| blank_matches(blank, by_id.get(&blank.id)))
        }
        Value::Array(in_order) => {
            in_order.len() == cloze.blanks.len()
                && cloze.blanks.iter().zip(in_order).all(|(blank, value)| blank_matches(blank, Some(value)))
        }
        Value::String(_) if cloze.blanks.len() == 1 => blank_matches(&cloze.blanks[0], Some(answer)),
        _ => false,
    }
}

fn short_answer_matches(short: &ShortAnswer, answer: &Value) -> bool {
    answer
        .as_str()
        .map(|text| text_matches(text, &short.accepted_answers, short.case_sensitive))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::QuestionType;
    use serde_json::json;

    fn single_choice_b() -> QuestionContent {
        QuestionContent::from_parts(
            QuestionType::SingleChoice,
            &json!([
                { "id": "A", "text": "Alpha", "is_correct": false },
                { "id": "B", "text": "Beta", "is_correct": true },
                { "id": "C", "text": "Gamma", "is_correct": false }
            ]),
        )
        .expect("valid question")
    }

    #[test]
    fn single_choice_worth_five_points() {
        let content = single_choice_b();

        let right = score_answer(&content, Some(&json!("B")), 5.0);
        let summary = summarize(&[right], 5.0, 5.0);
        assert_eq!(summary.total_score, 5.0);
        assert_eq!((summary.correct_count, summary.wrong_count), (1, 0));

        let wrong = score_answer(&content, Some(&json!(["A"])), 5.0);
        let summary = summarize(&[wrong], 5.0, 5.0);
        assert_eq!(summary.total_score, 0.0);
        assert_eq!((summary.correct_count, summary.wrong_count), (0, 1));

        let missing = score_answer(&content, None, 5.0);
        assert_eq!(missing, ItemScore { awarded_points: 0.0, is_correct: false, graded: false });
        assert_eq!(score_answer(&content, Some(&Value::Null), 5.0), missing);
        assert_eq!(summarize(&[missing], 5.0, 5.0).unanswered_count, 1);
    }

    #[test]
    fn multiple_choice_needs_exact_set() {
        let content = QuestionContent::from_parts(
            QuestionType::MultipleChoice,
            &json!([
                { "id": "a", "is_correct": true },
                { "id": "b", "is_correct": false },
                { "id": "c", "is_correct": true }
            ]),
        )
        .unwrap();

        assert!(score_answer(&content, Some(&json!(["c", "a"])), 2.0).is_correct);
        assert!(score_answer(&content, Some(&json!(["a", "c", "a"])), 2.0).is_correct);
        assert!(!score_answer(&content, Some(&json!(["a"])), 2.0).is_correct);
        assert!(!score_answer(&content, Some(&json!(["a", "b", "c"])), 2.0).is_correct);
    }

    #[test]
    fn wrong_shape_is_graded_incorrect() {
        let content = single_choice_b();
        let score = score_answer(&content, Some(&json!({ "choice": "B" })), 5.0);
        assert_eq!(score, ItemScore { awarded_points: 0.0, is_correct: false, graded: true });
        assert!(!score_answer(&content, Some(&json!([1, 2])), 5.0).is_correct);
    }

    #[test]
    fn cloze_requires_every_blank() {
        let content = QuestionContent::from_parts(
            QuestionType::ClozeMultiple,
            &json!({
                "text": "___ and ___",
                "blanks": [
                    { "id": "first", "accepted": ["Salt"] },
                    { "id": "second", "accepted": ["pepper", "black pepper"], "case_sensitive": false }
                ]
            }),
        )
        .unwrap();

        let by_id = json!({ "first": " salt ", "second": "Black   Pepper" });
        assert!(score_answer(&content, Some(&by_id), 3.0).is_correct);

        assert!(score_answer(&content, Some(&json!(["salt", "pepper"])), 3.0).is_correct);
        assert!(!score_answer(&content, Some(&json!(["salt"])), 3.0).is_correct);
        assert!(!score_answer(&content, Some(&json!({ "first": "salt" })), 3.0).is_correct);
    }

    #[test]
    fn case_sensitive_blank_respects_case() {
        let content = QuestionContent::from_parts(
            QuestionType::ClozeSingle,
            &json!({ "text": "H2O is ___", "blanks": [{ "id": "b", "accepted": ["Water"], "case_sensitive": true }] }),
        )
        .unwrap();

        assert!(score_answer(&content, Some(&json!("Water")), 1.0).is_correct);
        assert!(!score_answer(&content, Some(&json!("water")), 1.0).is_correct);
    }

    #[test]
    fn short_answer_matches_any_accepted_answer() {
        let content = QuestionContent::from_parts(
            QuestionType::ShortAnswer,
            &json!({ "accepted_answers": ["Paris", "City of Light"] }),
        )
        .unwrap();

        assert!(score_answer(&content, Some(&json!("  city  of light ")), 4.0).is_correct);
        assert!(!score_answer(&content, Some(&json!("Lyon")), 4.0).is_correct);
        assert!(!score_answer(&content, Some(&json!("   ")), 4.0).is_correct);
    }

    #[test]
    fn passing_boundary_is_inclusive() {
        let at = ItemScore { awarded_points: 60.0, is_correct: true, graded: true };
        assert!(summarize(&[at], 100.0, 60.0).passed);

        let below = ItemScore { awarded_points: 59.99, is_correct: true, graded: true };
        assert!(!summarize(&[below], 100.0, 60.0).passed);
    }

    #[test]
    fn counts_saturate_instead_of_wrapping() {
        assert_eq!(saturating_count(3), 3);
        assert_eq!(saturating_count(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(saturating_count(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  Hello \t  World\n", false), "hello world");
        assert_eq!(normalize_text("  Hello   World", true), "Hello World");
    }
}
