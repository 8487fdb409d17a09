//! Quiz generation from document text.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::error::QuizError;
use crate::llm::{ModelClient, ModelOutput};
use crate::quiz::prompts::quiz_prompt;
use crate::quiz::{QuizBatch, decode_batch};

/// Turns document text into a batch of quiz items via the model.
pub struct QuizGenerator {
    client: Arc<dyn ModelClient>,
    model_id: String,
}

impl QuizGenerator {
    pub fn new(client: Arc<dyn ModelClient>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    /// Generate `count` questions about `content`.
    ///
    /// The count is passed through to the prompt as-is; range checks belong
    /// to the caller. A successful result always holds at least one item.
    pub async fn generate(
        &self,
        document_id: Uuid,
        content: &str,
        count: u32,
    ) -> Result<QuizBatch, QuizError> {
        let prompt = quiz_prompt(content, count);
        let output = self.client.generate(&self.model_id, &prompt).await?;

        let items = match output {
            ModelOutput::Json(Value::Array(values)) => decode_batch(&values)?,
            ModelOutput::Json(_) => return Err(QuizError::NotASequence),
            ModelOutput::Text(raw) => return Err(QuizError::NotJson { raw }),
        };
        if items.is_empty() {
            return Err(QuizError::Empty);
        }

        if items.len() != count as usize {
            tracing::warn!(
                requested = count,
                received = items.len(),
                "Model returned a different number of questions than requested"
            );
        }
        tracing::info!(questions = items.len(), %document_id, "Quiz generated");
        Ok(QuizBatch::new(document_id, items))
    }
}
