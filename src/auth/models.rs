//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure. The `id` claim carries the local user identifier.
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub id: i64,
    pub exp: usize,
}

/// Account type. Users created through the OAuth flow are always `Normal`.
#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum UserType {
    Normal = 0,
    Admin = 1,
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Empty for OAuth-only users; such users cannot authenticate via the
    /// password flow.
    pub password: String,
    pub user_type: UserType,
}

/// A single provider's live grant for a user.
///
/// Expiry is advisory metadata only; nothing in this subsystem enforces it.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct OAuthToken {
    pub id: i64,
    pub version: i64,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: String,
    pub last_refresh: String,
    pub user_id: i64,
}

/// Candidate user profile resolved from a provider access token.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub email: String,
    pub user_type: UserType,
}

impl UserProfile {
    /// A profile is usable only with a non-empty email and the default
    /// account type.
    pub fn is_valid(&self) -> bool {
        !self.email.is_empty() && self.user_type == UserType::Normal
    }
}
