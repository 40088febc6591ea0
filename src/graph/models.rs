//! GraphQL data models

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Blog post database model, exposed directly over GraphQL.
#[derive(FromRow, SimpleObject, Serialize, Deserialize, Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: String,
    pub hero: String,
    pub published_at: String,
    pub updated_at: String,
}

/// The authenticated caller, as exposed by the `me` query.
/// Deliberately excludes the password hash column.
#[derive(SimpleObject, Debug, Clone)]
pub struct Viewer {
    pub id: i64,
    pub email: String,
    pub admin: bool,
}
