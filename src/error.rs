//! Error types for the learning assistant.

use std::time::Duration;

/// Errors that end a web request with an error page.
///
/// Model and quiz failures never get here: the wizard turns them into
/// notices on an ordinary page.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Access token refresh failed: {reason}")]
    TokenRefreshFailed { reason: String },
}

/// PDF processing errors.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unsupported media type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("Media processing failed: {reason}")]
    ProcessingFailed { reason: String },

    #[error("Media file too large: {size} bytes exceeds {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A model response that could not be decoded into quiz items.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Quiz item {index} has an unexpected shape: {reason}")]
    Shape { index: usize, reason: String },

    #[error("Quiz item {index} has {found} options, expected 4")]
    OptionCount { index: usize, found: usize },

    #[error("Quiz item {index} has an invalid answer letter: {answer:?}")]
    InvalidAnswer { index: usize, answer: String },

    #[error("Quiz item {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("Quiz item {index} has an invalid question number: {value}")]
    InvalidNumber { index: usize, value: String },
}

/// Quiz generation errors.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Model returned text that is not JSON")]
    NotJson { raw: String },

    #[error("Model returned JSON that is not a list of questions")]
    NotASequence,

    #[error("Model returned an empty list of questions")]
    Empty,

    #[error("Failed to decode quiz: {0}")]
    Decode(#[from] DecodeError),
}

/// Session and navigation errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown view: {name}")]
    UnknownView { name: String },
}

/// Web server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        addr: std::net::SocketAddr,
        reason: String,
    },
}
