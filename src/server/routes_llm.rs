use crate::llm::{MovieSummary, ShortSummary, SimilarMovies, Summarizer, SummaryRequest};
use crate::server::routes_api::Envelope;
use crate::server::{AppContext, AppError};
use axum::{extract::State, routing::post, Json, Router};
use moviehub_common::Error;

pub fn llm_routes() -> Router<AppContext> {
    Router::new()
        .route("/movie/summary", post(summary))
        .route("/movie/summary-only", post(summary_only))
        .route("/movie/similar", post(similar))
}

fn summarizer(ctx: &AppContext) -> Result<&Summarizer, AppError> {
    ctx.summarizer
        .as_ref()
        .ok_or_else(|| AppError(Error::NotConfigured("LLM API key is not set".into())))
}

async fn summary(
    State(ctx): State<AppContext>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<Envelope<MovieSummary>>, AppError> {
    let summary = summarizer(&ctx)?.full(&request).await?;
    Ok(Envelope::ok(summary))
}

async fn summary_only(
    State(ctx): State<AppContext>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<Envelope<ShortSummary>>, AppError> {
    let summary = summarizer(&ctx)?.summary_only(&request).await?;
    Ok(Envelope::ok(summary))
}

async fn similar(
    State(ctx): State<AppContext>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<Envelope<SimilarMovies>>, AppError> {
    let similar = summarizer(&ctx)?.similar(&request).await?;
    Ok(Envelope::ok(similar))
}
