//! # Graph Module
//!
//! GraphQL schema wiring and field resolvers for blog content, plus the
//! playground served at the root path.

pub mod models;
pub mod routes;
pub mod schema;


pub use routes::graph_routes;
pub use schema::{build_schema, BlogSchema};
