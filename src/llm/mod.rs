//! Model client for the hosted Gemini models.
//!
//! Every call uses the same generation parameters and asks for JSON output
//! matching the quiz schema. The response text is parsed as JSON when
//! possible and handed back raw otherwise; callers discriminate on
//! [`ModelOutput`].

mod auth;
mod gemini;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::LlmError;

pub use auth::{
    AccessTokenSource, AuthorizedUserCredentials, GoogleCredentials, RefreshingTokenSource,
    ServiceAccountKey, StaticToken,
};
pub use gemini::{GeminiClient, GeminiTarget};

/// What the model sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// The response text parsed as JSON.
    Json(Value),
    /// The response text as-is, when it was not valid JSON.
    Text(String),
}

impl ModelOutput {
    /// Parse response text, keeping it raw when it is not JSON.
    pub fn parse(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => Self::Json(value),
            Err(e) => {
                tracing::debug!("Model response is not JSON ({}), keeping raw text", e);
                Self::Text(raw)
            }
        }
    }
}

impl std::fmt::Display for ModelOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Json(Value::String(s)) => f.write_str(s),
            Self::Json(value) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| std::fmt::Error)?;
                f.write_str(&pretty)
            }
        }
    }
}

/// The boundary to the remote generative model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` to `model_id` with the fixed generation parameters.
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<ModelOutput, LlmError>;
}

/// Generation parameters sent with every request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    pub response_mime_type: String,
    pub response_schema: Value,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 2048,
            top_p: 0.8,
            top_k: 40,
            response_mime_type: "application/json".to_string(),
            response_schema: quiz_response_schema(),
        }
    }
}

/// JSON schema for an array of quiz items.
pub fn quiz_response_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "question-number": {"type": "number"},
                "question": {"type": "string"},
                "options": {
                    "type": "array",
                    "items": {"type": "string"}
                },
                "answer": {"type": "string"},
                "difficulty": {"type": "string"}
            },
            "required": ["question-number", "question", "options", "answer", "difficulty"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let out = ModelOutput::parse(r#"[{"question": "Why?"}]"#.to_string());
        match out {
            ModelOutput::Json(Value::Array(items)) => assert_eq!(items.len(), 1),
            other => panic!("expected JSON array, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_keeps_raw_text() {
        let raw = "Here is your quiz: 1. What colour is the sky?".to_string();
        assert_eq!(ModelOutput::parse(raw.clone()), ModelOutput::Text(raw));
    }

    #[test]
    fn test_display_text_and_json() {
        assert_eq!(ModelOutput::Text("plain".to_string()).to_string(), "plain");
        assert_eq!(
            ModelOutput::Json(Value::String("quoted".to_string())).to_string(),
            "quoted"
        );
        let rendered = ModelOutput::Json(json!({"a": 1})).to_string();
        assert!(rendered.contains("\"a\": 1"));
    }

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.temperature, 0.2);
        assert_eq!(params.max_output_tokens, 2048);
        assert_eq!(params.top_p, 0.8);
        assert_eq!(params.top_k, 40);
        assert_eq!(params.response_mime_type, "application/json");
    }

    #[test]
    fn test_params_serialize_camel_case() {
        let value = serde_json::to_value(GenerationParams::default()).unwrap();
        assert_eq!(value["maxOutputTokens"], 2048);
        assert_eq!(value["topK"], 40);
        assert_eq!(value["responseMimeType"], "application/json");
        assert_eq!(value["responseSchema"]["type"], "array");
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = quiz_response_schema();
        let required = schema["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
        assert!(required.contains(&json!("question-number")));
    }
}
