//! Simplified explanations for questions answered incorrectly.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{ModelClient, ModelOutput};
use crate::quiz::prompts::remediation_prompt;

pub struct RemediationGenerator {
    client: Arc<dyn ModelClient>,
    model_id: String,
}

impl RemediationGenerator {
    pub fn new(client: Arc<dyn ModelClient>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    /// Ask the model to explain the concepts behind `incorrect_questions`.
    ///
    /// Whatever the model returns is passed back unmodified.
    pub async fn explain(
        &self,
        content: &str,
        incorrect_questions: &[String],
    ) -> Result<ModelOutput, LlmError> {
        tracing::info!(
            questions = incorrect_questions.len(),
            "Requesting simplified explanation"
        );
        let prompt = remediation_prompt(content, incorrect_questions);
        self.client.generate(&self.model_id, &prompt).await
    }
}
