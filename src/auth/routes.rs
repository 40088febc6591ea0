//! OAuth routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the OAuth router
///
/// # Routes
/// - `GET /oauth/:version/:provider/login` - Start a provider login
/// - `GET /oauth/:version/:provider/callback` - Complete a provider login
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/oauth/:version/:provider/login", get(handlers::oauth_login))
        .route(
            "/oauth/:version/:provider/callback",
            get(handlers::oauth_callback),
        )
}
