//! GraphQL routes

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::Extension,
    response::Html,
    routing::{get, post},
    Router,
};

use super::schema::BlogSchema;
use crate::auth::CurrentUser;

/// POST /query
///
/// Executes a GraphQL request, threading the identity resolved by the
/// middleware into the resolver context.
pub async fn graphql_handler(
    Extension(schema): Extension<BlogSchema>,
    Extension(current_user): Extension<CurrentUser>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner().data(current_user)).await.into()
}

/// GET / - GraphQL playground
pub async fn playground() -> Html<String> {
    Html(playground_source(GraphQLPlaygroundConfig::new("/query")))
}

/// Creates and returns the GraphQL router
///
/// # Routes
/// - `GET /` - GraphQL playground
/// - `POST /query` - GraphQL execution endpoint
pub fn graph_routes() -> Router {
    Router::new()
        .route("/", get(playground))
        .route("/query", post(graphql_handler))
}
