//! Google OAuth 2.0 provider

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::{IntoResponse, Redirect};
use reqwest::Client;
use tracing::debug;

use crate::auth::models::{UserProfile, UserType};
use crate::auth::registry::{
    OAuth2Config, ProfileSource, ProviderError, ProviderRegistration,
};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub const PROVIDER_KEY: &str = "google";
pub const OAUTH_VERSION: i64 = 2;

/// Maps a Google access token to a user profile via the userinfo endpoint.
pub struct GoogleProfileSource;

#[async_trait]
impl ProfileSource for GoogleProfileSource {
    async fn user_from_token(
        &self,
        http: &Client,
        access_token: &str,
    ) -> Result<UserProfile, ProviderError> {
        let url = format!("{}?access_token={}", USERINFO_URL, access_token);

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let email = body
            .get("email")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ProviderError::InvalidProfile("no email in google user payload".to_string())
            })?
            .to_string();

        debug!("Resolved Google userinfo payload to profile");

        Ok(UserProfile {
            email,
            user_type: UserType::Normal,
        })
    }
}

/// Builds the Google registration. The redirect URL is derived from the
/// service base URL and the versioned provider path; login completion
/// redirects back to the application home.
pub fn registration(
    base_url: &str,
    client_id: String,
    client_secret: String,
) -> ProviderRegistration {
    let redirect_url = format!(
        "{}/oauth/{}/{}/callback",
        base_url, OAUTH_VERSION, PROVIDER_KEY
    );
    let home = base_url.to_string();

    ProviderRegistration {
        name: "Google".to_string(),
        key: PROVIDER_KEY.to_string(),
        version: OAUTH_VERSION,
        oauth: OAuth2Config {
            client_id,
            client_secret,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
            ],
            redirect_url,
            extra_auth_params: vec![("access_type", "offline"), ("prompt", "consent")],
        },
        profile: Arc::new(GoogleProfileSource),
        on_complete: Arc::new(move |_user| Redirect::to(&home).into_response()),
    }
}
