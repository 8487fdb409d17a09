//! Scoring submitted answers.
//!
//! A selection is correct when its first character matches the item's answer
//! letter, ignoring ASCII case, so option texts are expected to start with
//! their letter (`"B) Paris"` or `"b) Paris"` for answer `B`).

use serde::Serialize;

use crate::quiz::QuizItem;

/// How one question was answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub question: String,
    /// Full text of the chosen option; empty when nothing was chosen.
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Outcome of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreReport {
    pub score: usize,
    pub total: usize,
    pub records: Vec<AnswerRecord>,
}

impl ScoreReport {
    /// Question texts answered incorrectly, in quiz order.
    pub fn incorrect_questions(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.is_correct)
            .map(|r| r.question.clone())
            .collect()
    }

    pub fn all_correct(&self) -> bool {
        self.score == self.total
    }
}

/// Check a single selection against the answer letter.
pub fn is_match(selection: &str, item: &QuizItem) -> bool {
    selection
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&item.answer.as_char()))
}

/// Score one selection per item; missing selections count as wrong.
pub fn score_answers(items: &[QuizItem], selections: &[Option<String>]) -> ScoreReport {
    let records: Vec<AnswerRecord> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let user_answer = selections
                .get(idx)
                .and_then(|s| s.clone())
                .unwrap_or_default();
            AnswerRecord {
                question: item.question.clone(),
                is_correct: is_match(&user_answer, item),
                user_answer,
                correct_answer: item.answer.to_string(),
            }
        })
        .collect();

    ScoreReport {
        score: records.iter().filter(|r| r.is_correct).count(),
        total: items.len(),
        records,
    }
}
