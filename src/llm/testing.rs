//! Scripted model client for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::{ModelClient, ModelOutput};

/// Replays queued responses in order and records every prompt it receives.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelOutput, LlmError>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<ModelOutput, LlmError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn push_text(&self, raw: &str) -> &Self {
        self.push(Ok(ModelOutput::parse(raw.to_string())))
    }

    /// `(model_id, prompt)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<ModelOutput, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push((model_id.to_string(), prompt.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason: "no scripted response left".to_string(),
                })
            })
    }
}
