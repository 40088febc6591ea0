//! OAuth login flow handlers
//!
//! `GET /oauth/:version/:provider/login` starts a login attempt;
//! `GET /oauth/:version/:provider/callback` completes it. Each callback
//! step short-circuits with a structured JSON error; nothing is retried
//! inside a single attempt.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::response::{Redirect, Response};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::store::AuthStore;
use crate::common::{safe_email_log, ApiError, AppState};

/// Fallback access-token lifetime when the provider response omits
/// `expires_in`. Advisory only.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// GET /oauth/:version/:provider/login
///
/// Issues a per-attempt random state, persists it and redirects (303) to
/// the provider's authorization URL.
pub async fn oauth_login(
    Extension(state): Extension<Arc<AppState>>,
    Path((version, provider)): Path<(String, String)>,
) -> Result<Redirect, ApiError> {
    let version: i64 = version.parse().map_err(|_| ApiError::InvalidCallback)?;

    let registration = state
        .registry
        .find(&provider)
        .filter(|reg| reg.version == version)
        .ok_or_else(|| {
            warn!(provider = %provider, version = version, "Login requested for unknown provider");
            ApiError::UnknownProvider(provider.clone())
        })?;

    let store = AuthStore::new(state.db.clone());
    let login_state = store.issue_login_state(&provider).await?;

    let auth_url = registration.oauth.authorization_url(&login_state);
    info!(provider = %provider, "Redirecting to provider authorization URL");

    Ok(Redirect::to(&auth_url))
}

/// GET /oauth/:version/:provider/callback?state=...&code=...
///
/// Completes a login attempt: consumes the state, exchanges the code,
/// resolves the provider profile to a local user (creating one for an
/// unseen email), supersedes the stored credential and invokes the
/// registration's completion hook.
pub async fn oauth_callback(
    Extension(state): Extension<Arc<AppState>>,
    Path((version, provider)): Path<(String, String)>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let version: i64 = version.parse().map_err(|_| ApiError::InvalidCallback)?;
    info!(provider = %provider, version = version, "Processing callback from provider");

    let store = AuthStore::new(state.db.clone());

    // The state must be the one issued for this attempt; consumption is
    // single-use, so a replayed callback fails here as well.
    let login_state = params.state.as_deref().unwrap_or_default();
    if !store.consume_login_state(login_state, &provider).await? {
        warn!(provider = %provider, "Callback state missing, expired or already used");
        return Err(ApiError::CorruptedState);
    }

    let registration = state
        .registry
        .find(&provider)
        .filter(|reg| reg.version == version)
        .ok_or_else(|| {
            warn!(provider = %provider, version = version, "Callback for unknown provider");
            ApiError::UnknownProvider(provider.clone())
        })?;

    let code = match params.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => {
            warn!(provider = %provider, "Callback carried no authorization code");
            return Err(ApiError::TokenExchangeFailed);
        }
    };

    let tokens = registration
        .oauth
        .exchange_code(&state.http, code)
        .await
        .map_err(|e| {
            error!(provider = %provider, error = %e, "Failed to exchange code for token");
            ApiError::TokenExchangeFailed
        })?;

    let profile = registration
        .profile
        .user_from_token(&state.http, &tokens.access_token)
        .await
        .map_err(|e| {
            error!(provider = %provider, error = %e, "Access token to user payload failed");
            ApiError::ProfileResolutionFailed
        })?;

    if !profile.is_valid() {
        error!(provider = %provider, "Invalid user payload from token conversion");
        return Err(ApiError::ProfileResolutionFailed);
    }

    let user = store.find_or_create_user(&profile).await?;
    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        provider = %provider,
        "User resolved for OAuth callback"
    );

    let expiry = Utc::now()
        + Duration::seconds(tokens.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS));
    store
        .replace_credential(
            &provider,
            version,
            user.id,
            &tokens.access_token,
            tokens.refresh_token.as_deref().unwrap_or_default(),
            expiry,
        )
        .await?;

    info!(user_id = user.id, provider = %provider, "OAuth login completed");
    Ok((registration.on_complete)(&user))
}
