// Environment configuration loaded once at startup

use std::env;

use anyhow::{bail, Context};

/// Runtime configuration, read from the environment exactly once at startup.
///
/// Missing `DATABASE_URL` or `JWT_SECRET` is a fatal configuration error;
/// missing provider client credentials only disable that provider.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub cors_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match env::var("DATABASE_URL") {
            Ok(v) if !v.is_empty() => v,
            _ => bail!("DATABASE_URL is not set; refusing to start without a database"),
        };

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(v) if !v.is_empty() => v,
            _ => bail!("JWT_SECRET is not set; refusing to start without a signing secret"),
        };

        let database_max_connections = env_or_default("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?;
        let database_min_connections = env_or_default("DATABASE_MIN_CONNECTIONS", "1")
            .parse::<u32>()
            .context("DATABASE_MIN_CONNECTIONS must be a number")?;

        let server_host = env_or_default("SERVER_HOST", "http://localhost");
        let server_port = env_or_default("SERVER_PORT", "8080")
            .parse::<u16>()
            .context("SERVER_PORT must be a port number")?;

        let google_client_id = env::var("GOOGLE_CLIENT_ID").ok().filter(|v| !v.is_empty());
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET")
            .ok()
            .filter(|v| !v.is_empty());

        let cors_origins = env_or_default(
            "CORS_ORIGINS",
            "http://localhost:3000,http://localhost:5173",
        );

        Ok(Config {
            database_url,
            database_max_connections,
            database_min_connections,
            jwt_secret,
            server_host,
            server_port,
            google_client_id,
            google_client_secret,
            cors_origins,
        })
    }

    /// Externally visible base URL of the service, used to compute OAuth
    /// redirect URLs and the post-login redirect target.
    pub fn server_uri(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}
