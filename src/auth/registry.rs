//! Provider registry
//!
//! Holds one `ProviderRegistration` per external identity provider, keyed by
//! provider id. Built once at startup and read-only afterwards; duplicate
//! keys are rejected so a misconfiguration fails at boot rather than
//! silently shadowing a provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use super::models::{User, UserProfile};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("token exchange rejected: {0}")]
    ExchangeRejected(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("invalid user profile: {0}")]
    InvalidProfile(String),
}

#[derive(Debug, Error)]
#[error("duplicate provider key: {0}")]
pub struct DuplicateProviderKey(pub String);

/// Token pair returned by a provider's token endpoint.
#[derive(Debug, Deserialize)]
pub struct ProviderTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth2 client parameters for one provider.
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    /// Computed at registration: base URL + the versioned callback path.
    pub redirect_url: String,
    /// Provider-specific query parameters for the authorization URL
    /// (e.g. Google's `access_type=offline`).
    pub extra_auth_params: Vec<(&'static str, &'static str)>,
}

impl OAuth2Config {
    /// Builds the authorization URL embedding the per-attempt state value.
    pub fn authorization_url(&self, state: &str) -> String {
        let scope_param = self.scopes.join(" ");

        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&scope_param),
            urlencoding::encode(state),
        );

        for (key, value) in &self.extra_auth_params {
            url.push_str(&format!("&{}={}", key, value));
        }

        url
    }

    /// Exchanges an authorization code for an access/refresh token pair.
    /// A failure here terminates the login attempt; it is never retried.
    pub async fn exchange_code(
        &self,
        http: &Client,
        code: &str,
    ) -> Result<ProviderTokens, ProviderError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!(token_url = %self.token_url, "Exchanging authorization code for tokens");

        let response = http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(ProviderError::ExchangeRejected(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<ProviderTokens>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

/// Maps a provider access token to a candidate local user profile.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn user_from_token(
        &self,
        http: &Client,
        access_token: &str,
    ) -> Result<UserProfile, ProviderError>;
}

/// Hook invoked once a login attempt has fully succeeded; typically a
/// redirect back into the application.
pub type CompletionHook = Arc<dyn Fn(&User) -> Response + Send + Sync>;

/// Everything needed to run one provider's login flow.
pub struct ProviderRegistration {
    /// Human-readable name, e.g. "Google".
    pub name: String,
    /// Lookup key and path segment, e.g. "google".
    pub key: String,
    /// OAuth protocol version, part of the mounted path and the stored
    /// credential identity.
    pub version: i64,
    pub oauth: OAuth2Config,
    pub profile: Arc<dyn ProfileSource>,
    pub on_complete: CompletionHook,
}

/// Keyed mapping of provider registrations.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<ProviderRegistration>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registers a provider, failing fast on a duplicate key.
    pub fn register(
        &mut self,
        registration: ProviderRegistration,
    ) -> Result<(), DuplicateProviderKey> {
        let key = registration.key.clone();
        if self.providers.contains_key(&key) {
            return Err(DuplicateProviderKey(key));
        }
        self.providers.insert(key, Arc::new(registration));
        Ok(())
    }

    pub fn find(&self, key: &str) -> Option<Arc<ProviderRegistration>> {
        self.providers.get(key).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderRegistration>> {
        self.providers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
