//! GraphQL schema and resolvers
//!
//! Field resolvers are plain data-access glue over the posts table; the
//! interesting behavior is which identity (if any) the request carries.

use async_graphql::{Context, EmptySubscription, Error, Object, Result, Schema};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;

use super::models::{Post, Viewer};
use crate::auth::models::UserType;
use crate::auth::CurrentUser;

pub type BlogSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(pool: SqlitePool) -> BlogSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(pool)
        .finish()
}

fn current_user<'a>(ctx: &'a Context<'a>) -> Option<&'a crate::auth::User> {
    ctx.data_opt::<CurrentUser>().and_then(|c| c.0.as_ref())
}

fn db_error(e: sqlx::Error) -> Error {
    error!(error = %e, "Database error in resolver");
    Error::new("Internal error")
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn posts(&self, ctx: &Context<'_>) -> Result<Vec<Post>> {
        let pool = ctx.data_unchecked::<SqlitePool>();
        sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY id DESC")
            .fetch_all(pool)
            .await
            .map_err(db_error)
    }

    async fn post(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Post>> {
        let pool = ctx.data_unchecked::<SqlitePool>();
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(db_error)
    }

    /// The authenticated caller, or null for anonymous requests.
    async fn me(&self, ctx: &Context<'_>) -> Option<Viewer> {
        current_user(ctx).map(|user| Viewer {
            id: user.id,
            email: user.email.clone(),
            admin: user.user_type == UserType::Admin,
        })
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_post(
        &self,
        ctx: &Context<'_>,
        title: String,
        content: String,
        hero: Option<String>,
    ) -> Result<Post> {
        let user = current_user(ctx).ok_or_else(|| Error::new("authentication required"))?;

        let pool = ctx.data_unchecked::<SqlitePool>();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (title, content, author, hero, published_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&title)
        .bind(&content)
        .bind(&user.email)
        .bind(hero.unwrap_or_default())
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .map_err(db_error)?;

        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(pool)
            .await
            .map_err(db_error)
    }
}
