//! Google Gemini model client.
//!
//! Talks to Gemini either through Vertex AI (project + region, bearer token)
//! or through the Generative Language REST API (API key). Both speak the same
//! `generateContent` request/response format.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{Config, ModelBackend};
use crate::error::{ConfigError, LlmError};
use crate::llm::auth::{
    AccessTokenSource, GoogleCredentials, RefreshingTokenSource, StaticToken,
};
use crate::llm::{GenerationParams, ModelClient, ModelOutput};

const GENERATIVE_LANGUAGE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header carrying the Generative Language API key. Kept out of the URL so
/// the key never shows up in error messages or logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Where requests are sent and how they are authenticated.
pub enum GeminiTarget {
    Vertex {
        base_url: String,
        project_id: String,
        location: String,
        tokens: Arc<dyn AccessTokenSource>,
    },
    ApiKey {
        base_url: String,
        api_key: SecretString,
    },
}

impl GeminiTarget {
    fn provider(&self) -> &'static str {
        match self {
            Self::Vertex { .. } => "vertex",
            Self::ApiKey { .. } => "gemini",
        }
    }
}

/// Gemini client with fixed generation parameters.
pub struct GeminiClient {
    client: reqwest::Client,
    target: GeminiTarget,
    params: GenerationParams,
}

impl GeminiClient {
    /// Create a client for an explicit target.
    pub fn new(target: GeminiTarget) -> Self {
        Self {
            client: reqwest::Client::new(),
            target,
            params: GenerationParams::default(),
        }
    }

    /// Build a client from application configuration.
    ///
    /// For Vertex, an access token from the environment wins over the
    /// credentials file.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let target = match &config.backend {
            ModelBackend::ApiKey { api_key } => GeminiTarget::ApiKey {
                base_url: GENERATIVE_LANGUAGE_URL.to_string(),
                api_key: api_key.clone(),
            },
            ModelBackend::Vertex(vertex) => {
                let tokens: Arc<dyn AccessTokenSource> = match &vertex.access_token {
                    Some(token) => Arc::new(StaticToken::new(token.clone())),
                    None => {
                        let creds = GoogleCredentials::load(&vertex.credentials_path)?;
                        Arc::new(RefreshingTokenSource::new(creds))
                    }
                };
                GeminiTarget::Vertex {
                    base_url: format!("https://{}-aiplatform.googleapis.com", vertex.location),
                    project_id: vertex.project_id.clone(),
                    location: vertex.location.clone(),
                    tokens,
                }
            }
        };
        Ok(Self::new(target))
    }

    /// Build the `generateContent` URL for a model.
    fn build_url(&self, model: &str) -> String {
        match &self.target {
            GeminiTarget::Vertex {
                base_url,
                project_id,
                location,
                ..
            } => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                project_id,
                location,
                model
            ),
            GeminiTarget::ApiKey { base_url, .. } => format!(
                "{}/v1beta/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
        }
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: self.params.clone(),
        }
    }
}

// -- Gemini API request/response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<ModelOutput, LlmError> {
        let provider = self.target.provider();
        let url = self.build_url(model_id);
        let body = self.build_request(prompt);

        tracing::debug!(
            provider,
            model = model_id,
            prompt_chars = prompt.len(),
            "Sending generateContent request"
        );

        let request = self.client.post(&url).json(&body);
        let request = match &self.target {
            GeminiTarget::Vertex { tokens, .. } => {
                request.bearer_auth(tokens.access_token().await?)
            }
            GeminiTarget::ApiKey { api_key, .. } => {
                request.header(API_KEY_HEADER, api_key.expose_secret())
            }
        };

        let response = request.send().await.map_err(|e| LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: format!("HTTP request failed: {}", e.without_url()),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::AuthFailed {
                provider: provider.to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimited {
                provider: provider.to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let msg = serde_json::from_str::<GeminiErrorResponse>(&error_text)
                .ok()
                .and_then(|e| e.error.map(|d| d.message))
                .unwrap_or(error_text);
            return Err(LlmError::RequestFailed {
                provider: provider.to_string(),
                reason: format!("Status {}: {}", status, msg),
            });
        }

        let gemini_resp: GeminiResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: provider.to_string(),
                reason: format!("Failed to parse response: {}", e),
            })?;

        let candidate = gemini_resp
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: provider.to_string(),
                reason: "No candidates in response".to_string(),
            })?;

        if let Some(reason) = candidate.finish_reason.as_deref()
            && reason != "STOP"
        {
            tracing::warn!(provider, finish_reason = reason, "Generation did not finish cleanly");
        }

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        tracing::debug!(provider, "Raw response from Gemini: {}", text);

        Ok(ModelOutput::parse(text))
    }
}
