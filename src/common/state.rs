// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::registry::ProviderRegistry;
use crate::auth::token::TokenCodec;

/// Application state containing the database pool, outbound HTTP client,
/// token codec and the provider registry.
///
/// Constructed once in `main` and passed to handlers via `Extension`;
/// everything here is read-only after startup (the pool synchronizes
/// internally), so no locking is required for concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub http: Client,
    pub token_codec: TokenCodec,
    pub registry: Arc<ProviderRegistry>,
}
