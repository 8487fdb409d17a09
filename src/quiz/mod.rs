//! Quiz items and the strict decode from model JSON.

pub mod generator;
pub mod prompts;
pub mod remediation;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DecodeError;

pub use generator::QuizGenerator;
pub use remediation::RemediationGenerator;
pub use scoring::{AnswerRecord, ScoreReport, score_answers};

/// Every quiz item carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// The letter of the correct option, `A` through `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLetter(char);

impl AnswerLetter {
    /// Parse an answer as sent by the model.
    ///
    /// Accepts a bare letter (`"B"`, `"b"`) or a letter followed by
    /// punctuation (`"B)"`, `"B. Paris"`).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if !('A'..='D').contains(&letter) {
            return None;
        }
        match chars.next() {
            None => Some(Self(letter)),
            Some(next) if !next.is_alphanumeric() => Some(Self(letter)),
            Some(_) => None,
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl std::fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizItem {
    #[serde(rename = "question-number")]
    pub question_number: u32,
    pub question: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    pub answer: AnswerLetter,
    pub difficulty: String,
}

/// A quiz generated from one document.
#[derive(Debug, Clone, Serialize)]
pub struct QuizBatch {
    /// The document the questions were generated from.
    pub document_id: Uuid,
    pub items: Vec<QuizItem>,
    pub generated_at: DateTime<Utc>,
}

impl QuizBatch {
    pub fn new(document_id: Uuid, items: Vec<QuizItem>) -> Self {
        Self {
            document_id,
            items,
            generated_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Item shape as the model sends it, before validation.
#[derive(Deserialize)]
struct RawQuizItem {
    #[serde(rename = "question-number")]
    question_number: serde_json::Number,
    question: String,
    options: Vec<String>,
    answer: String,
    difficulty: String,
}

/// Decode a JSON array from the model into quiz items.
///
/// Each element must carry all schema fields, exactly four options and an
/// answer letter A–D. The first offending item stops the decode.
pub fn decode_batch(items: &[Value]) -> Result<Vec<QuizItem>, DecodeError> {
    items
        .iter()
        .enumerate()
        .map(|(index, value)| decode_item(index, value))
        .collect()
}

fn decode_item(index: usize, value: &Value) -> Result<QuizItem, DecodeError> {
    let raw = RawQuizItem::deserialize(value).map_err(|e| DecodeError::Shape {
        index,
        reason: e.to_string(),
    })?;

    let question_number = raw
        .question_number
        .as_u64()
        .or_else(|| {
            raw.question_number
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n >= 0.0)
                .map(|n| n as u64)
        })
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| DecodeError::InvalidNumber {
            index,
            value: raw.question_number.to_string(),
        })?;

    let question = raw.question.trim().to_string();
    if question.is_empty() {
        return Err(DecodeError::EmptyField {
            index,
            field: "question",
        });
    }

    let found = raw.options.len();
    let options: [String; OPTIONS_PER_QUESTION] = raw
        .options
        .try_into()
        .map_err(|_| DecodeError::OptionCount { index, found })?;
    if options.iter().any(|o| o.trim().is_empty()) {
        return Err(DecodeError::EmptyField {
            index,
            field: "option",
        });
    }

    let answer = AnswerLetter::parse(&raw.answer).ok_or_else(|| DecodeError::InvalidAnswer {
        index,
        answer: raw.answer.clone(),
    })?;

    Ok(QuizItem {
        question_number,
        question,
        options,
        answer,
        difficulty: raw.difficulty.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn item(options: Value, answer: &str) -> Value {
        json!({
            "question-number": 1,
            "question": "What colour is the sky?",
            "options": options,
            "answer": answer,
            "difficulty": "easy"
        })
    }

    fn four_options() -> Value {
        json!(["A) Blue", "B) Green", "C) Red", "D) Yellow"])
    }

    #[test]
    fn test_answer_letter_parse() {
        assert_eq!(AnswerLetter::parse("B").map(AnswerLetter::as_char), Some('B'));
        assert_eq!(AnswerLetter::parse(" c ").map(AnswerLetter::as_char), Some('C'));
        assert_eq!(AnswerLetter::parse("D) Paris").map(AnswerLetter::as_char), Some('D'));
        assert_eq!(AnswerLetter::parse("E"), None);
        assert_eq!(AnswerLetter::parse("Blue"), None);
        assert_eq!(AnswerLetter::parse(""), None);
    }

    #[test]
    fn test_decode_well_formed_item() {
        let items = decode_batch(&[item(four_options(), "A")]).unwrap();
        assert_eq!(
            items,
            vec![QuizItem {
                question_number: 1,
                question: "What colour is the sky?".to_string(),
                options: [
                    "A) Blue".to_string(),
                    "B) Green".to_string(),
                    "C) Red".to_string(),
                    "D) Yellow".to_string(),
                ],
                answer: AnswerLetter('A'),
                difficulty: "easy".to_string(),
            }]
        );
    }

    #[test]
    fn test_decode_accepts_float_question_number() {
        let mut value = item(four_options(), "B");
        value["question-number"] = json!(3.0);
        let items = decode_batch(&[value]).unwrap();
        assert_eq!(items[0].question_number, 3);
    }

    #[test]
    fn test_decode_rejects_fractional_question_number() {
        let mut value = item(four_options(), "B");
        value["question-number"] = json!(1.5);
        let err = decode_batch(&[value]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { index: 0, .. }));
    }

    #[test]
    fn test_decode_missing_field_names_item() {
        let ok = item(four_options(), "A");
        let mut broken = item(four_options(), "A");
        broken.as_object_mut().unwrap().remove("options");
        let err = decode_batch(&[ok, broken]).unwrap_err();
        match err {
            DecodeError::Shape { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("options"));
            }
            other => panic!("expected Shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_wrong_option_count() {
        let err = decode_batch(&[item(json!(["A) Blue", "B) Green", "C) Red"]), "A")]).unwrap_err();
        assert!(matches!(err, DecodeError::OptionCount { index: 0, found: 3 }));
    }

    #[test]
    fn test_decode_invalid_answer() {
        let err = decode_batch(&[item(four_options(), "Blue")]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidAnswer { .. }));
    }

    #[test]
    fn test_decode_empty_question() {
        let mut value = item(four_options(), "A");
        value["question"] = json!("   ");
        let err = decode_batch(&[value]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::EmptyField {
                field: "question",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_non_object_element() {
        let err = decode_batch(&[json!("just a string")]).unwrap_err();
        assert!(matches!(err, DecodeError::Shape { index: 0, .. }));
    }

    #[test]
    fn test_item_serializes_with_schema_names() {
        let items = decode_batch(&[item(four_options(), "C")]).unwrap();
        let value = serde_json::to_value(&items[0]).unwrap();
        assert_eq!(value["question-number"], 1);
        assert_eq!(value["answer"], "C");
    }
}
