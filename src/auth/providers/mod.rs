//! Provider implementations
//!
//! One module per external identity provider. Each exposes a
//! `registration(...)` builder used by `main` when the provider's client
//! credentials are configured.

pub mod google;
