//! Credential store adapter
//!
//! All user-identity and OAuth-credential persistence goes through
//! `AuthStore`; both the login flow and the identity middleware share it.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::models::{OAuthToken, User, UserProfile, UserType};
use crate::common::safe_email_log;

/// How long an issued login state stays valid.
const LOGIN_STATE_TTL_SECS: i64 = 600;

/// Length of the random anti-CSRF state value.
const LOGIN_STATE_LEN: usize = 32;

#[derive(Clone)]
pub struct AuthStore {
    db: SqlitePool,
}

impl AuthStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ---- users ----

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await
    }

    /// Creates a user from an OAuth profile: empty password hash, Normal type.
    pub async fn create_user(&self, profile: &UserProfile) -> Result<User, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (email, password, user_type) VALUES (?, '', ?)")
            .bind(&profile.email)
            .bind(UserType::Normal)
            .execute(&self.db)
            .await?;

        let id = result.last_insert_rowid();
        info!(
            user_id = id,
            email = %safe_email_log(&profile.email),
            "Created new user from OAuth profile"
        );

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await
    }

    /// Resolves a profile to a local user, creating one for an unseen email.
    /// Existing users are returned unmodified; email is the sole matching key.
    pub async fn find_or_create_user(&self, profile: &UserProfile) -> Result<User, sqlx::Error> {
        match self.find_user_by_email(&profile.email).await? {
            Some(user) => Ok(user),
            None => self.create_user(profile).await,
        }
    }

    // ---- provider credentials ----

    /// Replaces the live credential for (provider, version, user): deletes
    /// any prior rows and inserts the new grant in a single transaction, so
    /// a racing callback can never observe duplicate or zero live rows.
    pub async fn replace_credential(
        &self,
        provider: &str,
        version: i64,
        user_id: i64,
        access_token: &str,
        refresh_token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM oauth_tokens WHERE version = ? AND provider = ? AND user_id = ?")
            .bind(version)
            .bind(provider)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO oauth_tokens
                (version, provider, access_token, refresh_token, expiry, last_refresh, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(version)
        .bind(provider)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expiry.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            provider = provider,
            version = version,
            user_id = user_id,
            "Stored provider credential"
        );
        Ok(())
    }

    pub async fn credentials_for_user(
        &self,
        provider: &str,
        version: i64,
        user_id: i64,
    ) -> Result<Vec<OAuthToken>, sqlx::Error> {
        sqlx::query_as::<_, OAuthToken>(
            "SELECT * FROM oauth_tokens WHERE provider = ? AND version = ? AND user_id = ?",
        )
        .bind(provider)
        .bind(version)
        .bind(user_id)
        .fetch_all(&self.db)
        .await
    }

    // ---- login states ----

    /// Issues a fresh random anti-CSRF state for one login attempt and
    /// persists it with a short expiry.
    pub async fn issue_login_state(&self, provider: &str) -> Result<String, sqlx::Error> {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(LOGIN_STATE_LEN)
            .map(char::from)
            .collect();

        let expires_at = (Utc::now() + Duration::seconds(LOGIN_STATE_TTL_SECS)).timestamp();

        sqlx::query("INSERT INTO oauth_states (state, provider, expires_at) VALUES (?, ?, ?)")
            .bind(&state)
            .bind(provider)
            .bind(expires_at)
            .execute(&self.db)
            .await?;

        Ok(state)
    }

    /// Consumes a login state: returns true only for a known, unexpired
    /// state issued for this provider, and deletes it so it cannot be
    /// replayed. The conditional DELETE makes consumption atomic.
    pub async fn consume_login_state(
        &self,
        state: &str,
        provider: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().timestamp();

        // Opportunistic purge; there is no background sweeper.
        sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.db)
            .await?;

        let result = sqlx::query(
            "DELETE FROM oauth_states WHERE state = ? AND provider = ? AND expires_at > ?",
        )
        .bind(state)
        .bind(provider)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
