use crate::metadata::aggregation::{SearchRequest, SearchResponse};
use crate::server::{AppContext, AppError};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use moviehub_common::{Error, Movie, SortMode};
use serde::{Deserialize, Serialize};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/movie/:id", get(movie_details))
        .route("/merge", post(merge))
}

/// Success envelope shared by the JSON API.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

pub async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": ctx
            .aggregation
            .providers()
            .available()
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>(),
        "cache": ctx.cache.is_connected(),
        "llm": ctx.summarizer.is_some(),
        "toolServers": ctx.tools.len(),
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    query: Option<String>,
    year: Option<i32>,
    page: Option<u32>,
    limit: Option<usize>,
    sort: Option<String>,
}

async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| Error::Validation("query parameter is required".into()))?;

    let request = SearchRequest {
        query,
        year: params.year,
        page: params.page,
        limit: params.limit,
        sort: params
            .sort
            .as_deref()
            .map(SortMode::parse_lenient)
            .unwrap_or_default(),
    };
    Ok(Json(ctx.aggregation.search(&request).await?))
}

async fn movie_details(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Movie>>, AppError> {
    let movie = ctx.aggregation.get_movie_details(&id).await?;
    Ok(Envelope::ok(movie))
}

#[derive(Deserialize)]
struct MergeRequest {
    #[serde(default)]
    movies: Vec<Movie>,
}

async fn merge(
    State(ctx): State<AppContext>,
    Json(body): Json<MergeRequest>,
) -> Result<Json<Envelope<Movie>>, AppError> {
    let merged = ctx.aggregation.merge(&body.movies)?;
    Ok(Envelope::ok(merged))
}
