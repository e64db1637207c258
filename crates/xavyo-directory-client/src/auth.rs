//! Credential sources for directory requests: static bearer tokens and
//! `OAuth2` client credentials.

use crate::error::{DirectoryError, DirectoryResult};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Supplies bearer tokens for outbound requests.
///
/// Implementations must be safe to share across concurrent operations.
#[async_trait]
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    /// Return a token valid for at least the next request.
    async fn token(&self) -> DirectoryResult<String>;

    /// Drop any cached token after the service rejected it.
    async fn invalidate(&self) {}
}

/// Attach a bearer token from `source` to a request.
pub(crate) async fn authorize(
    source: &dyn TokenSource,
    builder: RequestBuilder,
) -> DirectoryResult<RequestBuilder> {
    let token = source.token().await?;
    Ok(builder.bearer_auth(token))
}

/// Credentials for the directory service.
///
/// The [`Debug`] impl redacts tokens and secrets.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum DirectoryCredentials {
    /// Pre-issued bearer token.
    #[serde(rename = "bearer")]
    Bearer { token: String },

    /// `OAuth2` client credentials grant.
    #[serde(rename = "oauth2")]
    OAuth2 {
        client_id: String,
        client_secret: String,
        token_endpoint: String,
        #[serde(default)]
        scopes: Vec<String>,
    },
}

impl std::fmt::Debug for DirectoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::OAuth2 {
                client_id,
                token_endpoint,
                scopes,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("token_endpoint", token_endpoint)
                .field("scopes", scopes)
                .finish(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuth2TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

/// [`TokenSource`] backed by [`DirectoryCredentials`].
///
/// `OAuth2` tokens are cached until shortly before expiry and shared across
/// clones.
#[derive(Debug, Clone)]
pub struct CredentialTokenSource {
    credentials: DirectoryCredentials,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    http_client: reqwest::Client,
}

impl CredentialTokenSource {
    #[must_use]
    pub fn new(credentials: DirectoryCredentials, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Shorthand for a static bearer token.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(
            DirectoryCredentials::Bearer {
                token: token.into(),
            },
            reqwest::Client::new(),
        )
    }

    async fn fetch_oauth2_token(
        &self,
        client_id: &str,
        client_secret: &str,
        token_endpoint: &str,
        scopes: &[String],
    ) -> DirectoryResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| !c.is_expired()) {
                return Ok(cached.access_token.clone());
            }
        }

        debug!("Fetching OAuth2 access token from {}", token_endpoint);
        let scope_str = scopes.join(" ");
        let mut form = vec![("grant_type", "client_credentials")];
        if !scopes.is_empty() {
            form.push(("scope", &scope_str));
        }

        let response = self
            .http_client
            .post(token_endpoint)
            .basic_auth(client_id, Some(client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| DirectoryError::Auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(DirectoryError::Auth(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token_response: OAuth2TokenResponse = response
            .json()
            .await
            .map_err(|e| DirectoryError::Auth(format!("Failed to parse token response: {e}")))?;

        // Expire 30 seconds early so a token never lapses mid-request.
        let expires_at = token_response
            .expires_in
            .map(|secs| Instant::now() + Duration::from_secs(secs.saturating_sub(30)));

        let access_token = token_response.access_token;
        *self.cached_token.write().await = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }
}

#[async_trait]
impl TokenSource for CredentialTokenSource {
    async fn token(&self) -> DirectoryResult<String> {
        match &self.credentials {
            DirectoryCredentials::Bearer { token } => Ok(token.clone()),
            DirectoryCredentials::OAuth2 {
                client_id,
                client_secret,
                token_endpoint,
                scopes,
            } => {
                self.fetch_oauth2_token(client_id, client_secret, token_endpoint, scopes)
                    .await
            }
        }
    }

    async fn invalidate(&self) {
        *self.cached_token.write().await = None;
    }
}
