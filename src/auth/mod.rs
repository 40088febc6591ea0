//! # Auth Module
//!
//! Authentication and session-identity resolution:
//! - OAuth2 login flow (authorization-code exchange, user upsert,
//!   credential rotation)
//! - JWT bearer token signing and verification
//! - Fail-open request identity middleware
//! - Provider registry and per-provider implementations

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod registry;
pub mod routes;
pub mod store;
pub mod token;

#[cfg(test)]
mod tests;

pub use middleware::CurrentUser;
pub use models::User;
pub use routes::oauth_routes;
