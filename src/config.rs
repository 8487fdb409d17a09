//! Configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is loaded first (if present), then
//! values are read from the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Model used for both quiz generation and remediation.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-001";

/// Vertex AI region.
pub const DEFAULT_LOCATION: &str = "us-central1";

const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// How the model endpoint is reached and authenticated.
#[derive(Debug, Clone)]
pub enum ModelBackend {
    /// Vertex AI, authenticated with an OAuth bearer token.
    Vertex(VertexConfig),
    /// Generative Language API, authenticated with an API key.
    ApiKey { api_key: SecretString },
}

/// Vertex AI project settings.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    /// Path to a `service_account` or `authorized_user` credentials JSON file.
    pub credentials_path: PathBuf,
    /// Pre-issued access token; takes precedence over the credentials file.
    pub access_token: Option<SecretString>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: ModelBackend,
    pub model: String,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub session_idle_timeout: Duration,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine; the environment may already be populated.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("GEMINI_API_KEY") {
            Some(key) => ModelBackend::ApiKey {
                api_key: SecretString::from(key),
            },
            None => {
                let project_id =
                    get("GOOGLE_CLOUD_PROJECT").ok_or_else(|| ConfigError::MissingRequired {
                        key: "GOOGLE_CLOUD_PROJECT".to_string(),
                        hint: "Set the Vertex AI project id, or set GEMINI_API_KEY to use the \
                               Generative Language API instead"
                            .to_string(),
                    })?;
                ModelBackend::Vertex(VertexConfig {
                    project_id,
                    location: get("VERTEX_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
                    credentials_path: PathBuf::from(
                        get("GOOGLE_APPLICATION_CREDENTIALS")
                            .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string()),
                    ),
                    access_token: get("VERTEX_ACCESS_TOKEN").map(SecretString::from),
                })
            }
        };

        let bind_addr = parse_or(
            "QUIZ_BIND_ADDR",
            get("QUIZ_BIND_ADDR"),
            DEFAULT_BIND_ADDR,
        )?;
        let max_upload_bytes = parse_or(
            "QUIZ_MAX_UPLOAD_BYTES",
            get("QUIZ_MAX_UPLOAD_BYTES"),
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;
        let idle_secs: u64 = parse_or(
            "QUIZ_SESSION_IDLE_SECS",
            get("QUIZ_SESSION_IDLE_SECS"),
            &DEFAULT_SESSION_IDLE_SECS.to_string(),
        )?;

        Ok(Self {
            backend,
            model: get("QUIZ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind_addr,
            max_upload_bytes,
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.unwrap_or_else(|| default.to_string());
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{:?}: {}", raw, e),
    })
}
