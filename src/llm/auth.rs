//! Access tokens for Vertex AI.
//!
//! Three sources are supported: a pre-issued token from the environment, an
//! `authorized_user` credentials file (as written by
//! `gcloud auth application-default login`) whose refresh token is exchanged
//! at Google's OAuth endpoint, or a `service_account` key that signs an RS256
//! JWT assertion for the same endpoint. Exchanged tokens are cached until
//! shortly before they expire.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{ConfigError, LlmError};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const CREDENTIALS_KEY: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Lifetime of a signed assertion. Google caps it at one hour.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// A source of OAuth bearer tokens.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, LlmError>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token`.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, LlmError> {
        Ok(self.0.expose_secret().to_string())
    }
}

/// Contents of an `authorized_user` credentials file.
#[derive(Clone)]
pub struct AuthorizedUserCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub token_uri: String,
}

impl std::fmt::Debug for AuthorizedUserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUserCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// A service-account key. The private key is parsed once at load time.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    signing_key: EncodingKey,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccountKey {
    /// Sign a token-request assertion issued at `now` (Unix seconds).
    fn assertion(&self, now: i64) -> Result<String, LlmError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME.as_secs() as i64,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(|e| {
            LlmError::TokenRefreshFailed {
                reason: format!("failed to sign assertion: {}", e),
            }
        })
    }
}

/// Credentials loaded from `GOOGLE_APPLICATION_CREDENTIALS`.
#[derive(Debug, Clone)]
pub enum GoogleCredentials {
    AuthorizedUser(AuthorizedUserCredentials),
    ServiceAccount(ServiceAccountKey),
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

impl GoogleCredentials {
    /// Load credentials from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
            key: CREDENTIALS_KEY.to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::parse(&raw)
    }

    /// Parse the JSON contents of a credentials file.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let file: CredentialsFile = serde_json::from_str(raw)
            .map_err(|e| ConfigError::ParseError(format!("credentials file: {}", e)))?;

        let missing = |field: &str| ConfigError::MissingRequired {
            key: format!("credentials.{}", field),
            hint: format!("The {} credentials file is incomplete", file.kind),
        };
        let token_uri = file
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        match file.kind.as_str() {
            "authorized_user" => Ok(Self::AuthorizedUser(AuthorizedUserCredentials {
                client_id: file.client_id.clone().ok_or_else(|| missing("client_id"))?,
                client_secret: SecretString::from(
                    file.client_secret
                        .clone()
                        .ok_or_else(|| missing("client_secret"))?,
                ),
                refresh_token: SecretString::from(
                    file.refresh_token
                        .clone()
                        .ok_or_else(|| missing("refresh_token"))?,
                ),
                token_uri,
            })),
            "service_account" => {
                let pem = file.private_key.as_deref().ok_or_else(|| missing("private_key"))?;
                let signing_key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                    ConfigError::InvalidValue {
                        key: CREDENTIALS_KEY.to_string(),
                        message: format!("service account private_key is not a valid RSA key: {}", e),
                    }
                })?;
                Ok(Self::ServiceAccount(ServiceAccountKey {
                    client_email: file
                        .client_email
                        .clone()
                        .ok_or_else(|| missing("client_email"))?,
                    private_key_id: file.private_key_id.clone(),
                    token_uri,
                    signing_key,
                }))
            }
            other => Err(ConfigError::InvalidValue {
                key: CREDENTIALS_KEY.to_string(),
                message: format!(
                    "credentials of type '{}' are not supported; use a service_account \
                     or authorized_user file, or set VERTEX_ACCESS_TOKEN",
                    other
                ),
            }),
        }
    }

    fn token_uri(&self) -> &str {
        match self {
            Self::AuthorizedUser(c) => &c.token_uri,
            Self::ServiceAccount(k) => &k.token_uri,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::AuthorizedUser(_) => "authorized_user",
            Self::ServiceAccount(_) => "service_account",
        }
    }

    /// Form fields for the token request.
    fn grant(&self) -> Result<Vec<(&'static str, String)>, LlmError> {
        Ok(match self {
            Self::AuthorizedUser(c) => vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", c.refresh_token.expose_secret().to_string()),
                ("client_id", c.client_id.clone()),
                ("client_secret", c.client_secret.expose_secret().to_string()),
            ],
            Self::ServiceAccount(k) => vec![
                ("grant_type", JWT_BEARER_GRANT.to_string()),
                ("assertion", k.assertion(Utc::now().timestamp())?),
            ],
        })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct CachedToken {
    token: SecretString,
    obtained_at: Instant,
    expires_in: Option<Duration>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        match self.expires_in {
            Some(expires_in) => self.obtained_at.elapsed() + EXPIRY_BUFFER > expires_in,
            None => false,
        }
    }
}

/// Exchanges credentials for access tokens and caches the result.
pub struct RefreshingTokenSource {
    client: reqwest::Client,
    credentials: GoogleCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingTokenSource {
    pub fn new(credentials: GoogleCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<CachedToken, LlmError> {
        let params = self.credentials.grant()?;

        let response = self
            .client
            .post(self.credentials.token_uri())
            .form(&params)
            .send()
            .await
            .map_err(|e| LlmError::TokenRefreshFailed {
                reason: format!("request failed: {}", e.without_url()),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::TokenRefreshFailed {
                reason: format!("status {}: {}", status, error_text),
            });
        }

        let body: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::TokenRefreshFailed {
                    reason: format!("failed to parse token response: {}", e),
                })?;

        tracing::info!(
            credentials = self.credentials.kind(),
            expires_in = body.expires_in,
            "Refreshed Vertex AI access token"
        );

        Ok(CachedToken {
            token: SecretString::from(body.access_token),
            obtained_at: Instant::now(),
            expires_in: body.expires_in.map(Duration::from_secs),
        })
    }
}

#[async_trait]
impl AccessTokenSource for RefreshingTokenSource {
    async fn access_token(&self) -> Result<String, LlmError> {
        // Held across the refresh so concurrent callers wait for one exchange.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.is_expired()
        {
            return Ok(token.token.expose_secret().to_string());
        }

        let fresh = self.refresh().await?;
        let value = fresh.token.expose_secret().to_string();
        *cached = Some(fresh);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const AUTHORIZED_USER: &str = r#"{
        "type": "authorized_user",
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "shh",
        "refresh_token": "1//refresh"
    }"#;

    const TEST_PRIVATE_KEY: &str = include_str!("testdata/service_account_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("testdata/service_account_pub.pem");

    fn service_account_json(token_uri: &str) -> String {
        json!({
            "type": "service_account",
            "project_id": "quiz-project",
            "private_key_id": "key-1",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "quiz@quiz-project.iam.gserviceaccount.com",
            "client_id": "1234567890",
            "token_uri": token_uri
        })
        .to_string()
    }

    fn authorized_user() -> AuthorizedUserCredentials {
        match GoogleCredentials::parse(AUTHORIZED_USER).unwrap() {
            GoogleCredentials::AuthorizedUser(c) => c,
            other => panic!("expected authorized_user, got {:?}", other),
        }
    }

    /// Serve `router` on an ephemeral port and return its token URL.
    async fn serve_token_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/token", addr)
    }

    #[test]
    fn test_parse_authorized_user() {
        let creds = authorized_user();
        assert_eq!(creds.client_id, "123.apps.googleusercontent.com");
        assert_eq!(creds.refresh_token.expose_secret(), "1//refresh");
        assert_eq!(creds.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_parse_service_account() {
        let creds = GoogleCredentials::parse(&service_account_json(DEFAULT_TOKEN_URI)).unwrap();
        match creds {
            GoogleCredentials::ServiceAccount(key) => {
                assert_eq!(key.client_email, "quiz@quiz-project.iam.gserviceaccount.com");
                assert_eq!(key.private_key_id.as_deref(), Some("key-1"));
                assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
            }
            other => panic!("expected service_account, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", authorized_user());
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("1//refresh"));
        assert!(debug.contains("[REDACTED]"));

        let creds = GoogleCredentials::parse(&service_account_json(DEFAULT_TOKEN_URI)).unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("BEGIN PRIVATE KEY"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_service_account_with_bad_key_is_rejected() {
        let err = GoogleCredentials::parse(
            r#"{"type": "service_account", "client_email": "a@b", "private_key": "-----BEGIN"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert!(err.to_string().contains("private_key"));
    }

    #[test]
    fn test_service_account_missing_email_names_field() {
        let mut value: Value =
            serde_json::from_str(&service_account_json(DEFAULT_TOKEN_URI)).unwrap();
        value.as_object_mut().unwrap().remove("client_email");
        let err = GoogleCredentials::parse(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("client_email"));
    }

    #[test]
    fn test_unsupported_type_is_rejected_with_hint() {
        let err = GoogleCredentials::parse(r#"{"type": "external_account"}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("external_account"));
        assert!(msg.contains("VERTEX_ACCESS_TOKEN"));
    }

    #[test]
    fn test_incomplete_file_names_missing_field() {
        let err = GoogleCredentials::parse(r#"{"type": "authorized_user", "client_id": "x"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GoogleCredentials::load(Path::new("/nonexistent/creds.json")).unwrap_err();
        assert!(err.to_string().contains(CREDENTIALS_KEY));
    }

    #[test]
    fn test_assertion_claims() {
        let key = match GoogleCredentials::parse(&service_account_json(DEFAULT_TOKEN_URI)).unwrap()
        {
            GoogleCredentials::ServiceAccount(key) => key,
            other => panic!("expected service_account, got {:?}", other),
        };
        let now = Utc::now().timestamp();
        let jwt = key.assertion(now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        let decoded = jsonwebtoken::decode::<Value>(
            &jwt,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
        assert_eq!(decoded.claims["iss"], "quiz@quiz-project.iam.gserviceaccount.com");
        assert_eq!(decoded.claims["scope"], CLOUD_PLATFORM_SCOPE);
        assert_eq!(decoded.claims["iat"], now);
        assert_eq!(decoded.claims["exp"], now + 3600);
    }

    #[test]
    fn test_cached_token_expiry() {
        let fresh = CachedToken {
            token: SecretString::from("t".to_string()),
            obtained_at: Instant::now(),
            expires_in: Some(Duration::from_secs(3600)),
        };
        assert!(!fresh.is_expired());

        let nearly_gone = CachedToken {
            token: SecretString::from("t".to_string()),
            obtained_at: Instant::now(),
            expires_in: Some(Duration::from_secs(30)),
        };
        assert!(nearly_gone.is_expired());
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new(SecretString::from("ya29.static".to_string()));
        assert_eq!(source.access_token().await.unwrap(), "ya29.static");
    }

    #[tokio::test]
    async fn test_refresh_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/token",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
                    Json(json!({
                        "access_token": "ya29.fresh",
                        "expires_in": 3599,
                        "token_type": "Bearer"
                    }))
                }
            }),
        );
        let mut creds = authorized_user();
        creds.token_uri = serve_token_endpoint(app).await;
        let source = RefreshingTokenSource::new(GoogleCredentials::AuthorizedUser(creds));

        assert_eq!(source.access_token().await.unwrap(), "ya29.fresh");
        assert_eq!(source.access_token().await.unwrap(), "ya29.fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_service_account_exchange_is_cached() {
        let received = Arc::new(std::sync::Mutex::new(Vec::<HashMap<String, String>>::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/token",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(form);
                    Json(json!({
                        "access_token": "ya29.service",
                        "expires_in": 3599,
                        "token_type": "Bearer"
                    }))
                }
            }),
        );
        let token_uri = serve_token_endpoint(app).await;
        let creds = GoogleCredentials::parse(&service_account_json(&token_uri)).unwrap();
        let source = RefreshingTokenSource::new(creds);

        assert_eq!(source.access_token().await.unwrap(), "ya29.service");
        assert_eq!(source.access_token().await.unwrap(), "ya29.service");

        let forms = received.lock().unwrap().clone();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0]["grant_type"], JWT_BEARER_GRANT);

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[token_uri.as_str()]);
        let decoded = jsonwebtoken::decode::<Value>(
            &forms[0]["assertion"],
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims["iss"], "quiz@quiz-project.iam.gserviceaccount.com");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let app = Router::new().route(
            "/token",
            post(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    r#"{"error": "invalid_grant"}"#,
                )
            }),
        );
        let mut creds = authorized_user();
        creds.token_uri = serve_token_endpoint(app).await;
        let err = RefreshingTokenSource::new(GoogleCredentials::AuthorizedUser(creds))
            .access_token()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
