use crate::server::routes_api::Envelope;
use crate::server::{AppContext, AppError};
use crate::watchlist::{NewWatchlistItem, WatchlistUpdate};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use moviehub_common::{Error, User, WatchStatus, WatchlistItem, WatchlistStats};
use serde::Deserialize;
use uuid::Uuid;

pub fn watchlist_routes() -> Router<AppContext> {
    Router::new()
        .route("/users", get(list_users))
        .route("/user/:user_id", get(get_user))
        .route("/watchlist/:user_id", get(list_watchlist).post(add_item))
        .route("/watchlist/:user_id/stats", get(stats))
        .route(
            "/watchlist/item/:item_id",
            get(get_item).patch(update_item).delete(delete_item),
        )
}

async fn list_users(State(ctx): State<AppContext>) -> Json<Envelope<Vec<User>>> {
    Envelope::ok(ctx.watchlist.users())
}

async fn get_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> Result<Json<Envelope<User>>, AppError> {
    Ok(Envelope::ok(ctx.watchlist.user(&user_id)?))
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<WatchStatus>,
}

async fn list_watchlist(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<ListQuery>,
) -> Json<Envelope<Vec<WatchlistItem>>> {
    Envelope::ok(ctx.watchlist.list(&user_id, params.status))
}

async fn stats(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> Json<Envelope<WatchlistStats>> {
    Envelope::ok(ctx.watchlist.stats(&user_id))
}

async fn add_item(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Json(item): Json<NewWatchlistItem>,
) -> Result<Json<Envelope<WatchlistItem>>, AppError> {
    Ok(Envelope::ok(ctx.watchlist.add(&user_id, item)?))
}

/// Item ids are UUIDs; anything else cannot name an entry.
fn parse_item_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError(Error::not_found("watchlist item", raw)))
}

async fn get_item(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<Json<Envelope<WatchlistItem>>, AppError> {
    let id = parse_item_id(&item_id)?;
    Ok(Envelope::ok(ctx.watchlist.get(id)?))
}

async fn update_item(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
    Json(update): Json<WatchlistUpdate>,
) -> Result<Json<Envelope<WatchlistItem>>, AppError> {
    let id = parse_item_id(&item_id)?;
    let item = ctx.watchlist.update(id, update)?;
    tracing::info!(item = %id, "Updated watchlist item");
    Ok(Envelope::ok(item))
}

async fn delete_item(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_item_id(&item_id)?;
    ctx.watchlist.remove(id)?;
    tracing::info!(item = %id, "Deleted watchlist item");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Item deleted",
    })))
}
