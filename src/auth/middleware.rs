//! Request identity middleware
//!
//! Attaches a `CurrentUser` to every request before the GraphQL layer runs.
//! Verification failures are logged and degrade to an anonymous request;
//! this layer never rejects. Whether an anonymous caller may do something
//! is decided by the resolvers, not here.

use std::sync::Arc;

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::models::User;
use super::store::AuthStore;
use crate::common::{safe_token_log, AppState};

/// The identity resolved for one in-flight request. `None` means the
/// request is anonymous.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

/// Middleware wrapping every inbound request. Fail-open: the request always
/// proceeds, with or without an identity attached.
pub async fn identity_middleware(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = resolve_identity(&state, request.headers()).await;
    request.extensions_mut().insert(CurrentUser(identity));
    next.run(request).await
}

/// Resolves the request's bearer token to a user record, if any.
///
/// Returns `None` for a missing or non-`Bearer ` Authorization header
/// (anonymous requests are valid), and for any token verification failure
/// or unknown user id (logged, never surfaced to the client).
pub async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let header = match headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        Some(h) => h,
        None => {
            debug!("Serving request without auth token");
            return None;
        }
    };

    // Exact prefix match: case-sensitive, exactly one space.
    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            debug!("Authorization header without Bearer prefix, serving anonymously");
            return None;
        }
    };

    let user_id = match state.token_codec.verify(token) {
        Ok(id) => id,
        Err(e) => {
            warn!(
                error = %e,
                token = %safe_token_log(token),
                "Bearer token verification failed, serving anonymously"
            );
            return None;
        }
    };

    let store = AuthStore::new(state.db.clone());
    match store.find_user_by_id(user_id).await {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "Request identity resolved");
            Some(user)
        }
        Ok(None) => {
            warn!(user_id = user_id, "Valid token for unknown user id, serving anonymously");
            None
        }
        Err(e) => {
            error!(error = %e, user_id = user_id, "Database error during identity lookup");
            None
        }
    }
}
