// Database migrations
//
// Entity shapes are created idempotently at startup; there is no
// migration-versioning machinery beyond CREATE TABLE IF NOT EXISTS.

use sqlx::SqlitePool;
use tracing::info;

/// Creates all tables required by the application if they do not exist.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Canonical local identities. Password is empty for OAuth-only users.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL DEFAULT '',
            user_type INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(pool)
        .await?;

    // Live per-provider OAuth grants. At most one row per
    // (provider, version, user_id); replacement happens transactionally.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL DEFAULT 2,
            provider TEXT NOT NULL,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            expiry TEXT NOT NULL,
            last_refresh TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_oauth_tokens_user ON oauth_tokens(user_id)")
        .execute(pool)
        .await?;

    // Per-attempt anti-CSRF login states, single-use with a short expiry.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_states (
            state TEXT PRIMARY KEY,
            provider TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Blog content served by the GraphQL layer.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            author TEXT NOT NULL,
            hero TEXT NOT NULL DEFAULT '',
            published_at TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database migration completed");
    Ok(())
}
