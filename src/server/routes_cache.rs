use crate::server::AppContext;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::delete,
    Json, Router,
};
use serde::Deserialize;

pub fn cache_routes() -> Router<AppContext> {
    Router::new()
        .route("/cache", delete(clear_all))
        .route("/cache/search", delete(invalidate_search))
}

async fn clear_all(State(ctx): State<AppContext>) -> impl IntoResponse {
    let removed = ctx.cache.clear_all().await;
    Json(serde_json::json!({ "success": true, "removed": removed }))
}

#[derive(Deserialize)]
struct InvalidateQuery {
    query: Option<String>,
}

async fn invalidate_search(
    State(ctx): State<AppContext>,
    Query(params): Query<InvalidateQuery>,
) -> impl IntoResponse {
    let query = params.query.as_deref().filter(|q| !q.trim().is_empty());
    let removed = ctx.cache.invalidate_search(query).await;
    tracing::info!(query = ?query, removed, "Search cache invalidated");
    Json(serde_json::json!({ "success": true, "removed": removed }))
}
