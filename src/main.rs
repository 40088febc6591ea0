// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod graph;

use auth::providers::google;
use auth::registry::ProviderRegistry;
use auth::token::TokenCodec;
use common::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Fails fast on missing store connectivity or signing secret.
    let config = Config::from_env()?;
    let base_url = config.server_uri();

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // PROVIDER REGISTRY
    // ========================================================================

    let mut registry = ProviderRegistry::new();

    match (
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    ) {
        (Some(client_id), Some(client_secret)) => {
            registry.register(google::registration(&base_url, client_id, client_secret))?;
        }
        _ => {
            // A missing provider config disables that provider only.
            warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set; Google login disabled");
        }
    }

    for registration in registry.iter() {
        info!(
            provider = %registration.name,
            version = registration.version,
            redirect_url = %registration.oauth.redirect_url,
            "Registered OAuth provider"
        );
    }
    if registry.is_empty() {
        warn!("No OAuth providers configured; only bearer-token auth is available");
    }

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let http_client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let app_state = AppState {
        db: pool.clone(),
        http: http_client,
        token_codec: TokenCodec::new(config.jwt_secret.clone()),
        registry: Arc::new(registry),
    };
    let shared = Arc::new(app_state);

    let schema = graph::build_schema(pool);

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(graph::graph_routes())
        .merge(auth::oauth_routes())
        .layer(middleware::from_fn(auth::middleware::identity_middleware))
        .layer(Extension(schema))
        .layer(Extension(shared))
        .layer({
            let origins: Vec<axum::http::HeaderValue> = config
                .cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {} - GraphQL playground at /", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
