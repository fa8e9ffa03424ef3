//! In-process tool servers backed by the provider adapters and the
//! watchlist store.

use std::sync::Arc;

use async_trait::async_trait;
use moviehub_common::{WatchStatus, WatchlistItem};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode_args, encode_result, ToolDescriptor, ToolError, ToolServer};
use crate::metadata::providers::tmdb::DiscoverParams;
use crate::metadata::providers::tvmaze::TvmazeSearchHit;
use crate::metadata::providers::{OmdbProvider, TmdbProvider, TvmazeProvider};
use crate::metadata::ProviderSet;
use crate::watchlist::WatchlistStore;

pub const TMDB_SERVER: &str = "tmdb-provider";
pub const OMDB_SERVER: &str = "omdb-provider";
pub const TVMAZE_SERVER: &str = "tvmaze-provider";
pub const USER_SERVER: &str = "user-service";

/// Every local tool server that can be built from the enabled providers.
pub fn local_servers(
    providers: &ProviderSet,
    watchlist: Arc<WatchlistStore>,
) -> Vec<Arc<dyn ToolServer>> {
    let mut servers: Vec<Arc<dyn ToolServer>> = Vec::new();
    if let Some(tmdb) = &providers.tmdb {
        servers.push(Arc::new(TmdbToolServer::new(tmdb.clone())));
    }
    if let Some(omdb) = &providers.omdb {
        servers.push(Arc::new(OmdbToolServer::new(omdb.clone())));
    }
    if let Some(tvmaze) = &providers.tvmaze {
        servers.push(Arc::new(TvmazeToolServer::new(tvmaze.clone())));
    }
    servers.push(Arc::new(UserToolServer::new(watchlist)));
    servers
}

fn query_schema(extra: Value) -> Value {
    let mut properties = json!({
        "query": {"type": "string", "description": "Search text"},
        "year": {"type": "integer"},
        "page": {"type": "integer", "minimum": 1}
    });
    if let (Some(props), Value::Object(extra)) = (properties.as_object_mut(), extra) {
        props.extend(extra);
    }
    json!({"type": "object", "properties": properties, "required": ["query"]})
}

// ---------------------------------------------------------------------------
// TMDB
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    #[serde(default)]
    page: Option<u32>,
}

/// TMDB ids arrive as either numbers or numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericId {
    Number(u64),
    Text(String),
}

impl NumericId {
    fn parse(&self, tool: &str) -> Result<u64, ToolError> {
        match self {
            NumericId::Number(n) => Ok(*n),
            NumericId::Text(s) => s
                .trim()
                .trim_start_matches("tmdb-")
                .parse()
                .map_err(|_| ToolError::InvalidArguments {
                    tool: tool.to_string(),
                    message: format!("movieId {s:?} is not numeric"),
                }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsArgs {
    movie_id: NumericId,
}

#[derive(Debug, Deserialize)]
struct DirectorArgs {
    director: String,
    #[serde(default)]
    page: Option<u32>,
}

pub struct TmdbToolServer {
    provider: Arc<TmdbProvider>,
}

impl TmdbToolServer {
    pub fn new(provider: Arc<TmdbProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolServer for TmdbToolServer {
    fn name(&self) -> &str {
        TMDB_SERVER
    }

    fn description(&self) -> &str {
        "TMDB movie catalog"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("search_movies", "Search movies by title", query_schema(json!({}))),
            ToolDescriptor::new(
                "get_movie_details",
                "Full details, credits and external ids for a movie",
                json!({
                    "type": "object",
                    "properties": {"movieId": {"type": ["integer", "string"]}},
                    "required": ["movieId"]
                }),
            ),
            ToolDescriptor::new(
                "get_popular_movies",
                "Currently popular movies",
                json!({"type": "object", "properties": {"page": {"type": "integer"}}}),
            ),
            ToolDescriptor::new(
                "discover_movies",
                "Browse movies by genre and year",
                json!({
                    "type": "object",
                    "properties": {
                        "genreId": {"type": "integer"},
                        "sortBy": {"type": "string", "default": "popularity.desc"},
                        "year": {"type": "integer"},
                        "page": {"type": "integer"}
                    }
                }),
            ),
            ToolDescriptor::new(
                "search_movies_by_director",
                "Movies crewed by a director",
                json!({
                    "type": "object",
                    "properties": {"director": {"type": "string"}, "page": {"type": "integer"}},
                    "required": ["director"]
                }),
            ),
        ]
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "search_movies" => {
                let args: QueryArgs = decode_args(tool, args)?;
                let page = self
                    .provider
                    .search_page(&args.query, args.year, args.page.unwrap_or(1))
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &page)
            }
            "get_movie_details" => {
                let args: DetailsArgs = decode_args(tool, args)?;
                let id = args.movie_id.parse(tool)?;
                let details = self
                    .provider
                    .details(id)
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &details)
            }
            "get_popular_movies" => {
                let args: PageArgs = decode_args(tool, args)?;
                let page = self
                    .provider
                    .popular(args.page.unwrap_or(1))
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &page)
            }
            "discover_movies" => {
                let params: DiscoverParams = decode_args(tool, args)?;
                let page = self
                    .provider
                    .discover(&params)
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &page)
            }
            "search_movies_by_director" => {
                let args: DirectorArgs = decode_args(tool, args)?;
                let page = self
                    .provider
                    .search_by_director(&args.director, args.page.unwrap_or(1))
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &page)
            }
            other => Err(ToolError::UnknownTool {
                server: TMDB_SERVER.to_string(),
                tool: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// OMDb
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OmdbSearchArgs {
    query: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OmdbLookupArgs {
    #[serde(default)]
    imdb_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<i32>,
}

pub struct OmdbToolServer {
    provider: Arc<OmdbProvider>,
}

impl OmdbToolServer {
    pub fn new(provider: Arc<OmdbProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolServer for OmdbToolServer {
    fn name(&self) -> &str {
        OMDB_SERVER
    }

    fn description(&self) -> &str {
        "OMDb ratings database"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "search_movies",
                "Search titles by keyword",
                query_schema(json!({
                    "type": {"type": "string", "enum": ["movie", "series", "episode"]}
                })),
            ),
            ToolDescriptor::new(
                "get_movie_by_id",
                "Full record with ratings, by IMDb id or exact title",
                json!({
                    "type": "object",
                    "properties": {
                        "imdbId": {"type": "string"},
                        "title": {"type": "string"},
                        "year": {"type": "integer"}
                    }
                }),
            ),
        ]
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "search_movies" => {
                let args: OmdbSearchArgs = decode_args(tool, args)?;
                let page = self
                    .provider
                    .search_page(
                        &args.query,
                        args.year,
                        args.kind.as_deref(),
                        args.page.unwrap_or(1),
                    )
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &page)
            }
            "get_movie_by_id" => {
                let args: OmdbLookupArgs = decode_args(tool, args)?;
                let result = match (&args.imdb_id, &args.title) {
                    (Some(id), _) => self.provider.details(id).await,
                    (None, Some(title)) => self.provider.details_by_title(title, args.year).await,
                    (None, None) => {
                        return Err(ToolError::InvalidArguments {
                            tool: tool.to_string(),
                            message: "either imdbId or title is required".to_string(),
                        })
                    }
                };
                let details = result.map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &details)
            }
            other => Err(ToolError::UnknownTool {
                server: OMDB_SERVER.to_string(),
                tool: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TVMaze
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ShowSearchArgs {
    query: String,
}

/// Payload of `tvmaze-provider.search_shows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowSearchResult {
    #[serde(default)]
    pub results: Vec<TvmazeSearchHit>,
}

pub struct TvmazeToolServer {
    provider: Arc<TvmazeProvider>,
}

impl TvmazeToolServer {
    pub fn new(provider: Arc<TvmazeProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolServer for TvmazeToolServer {
    fn name(&self) -> &str {
        TVMAZE_SERVER
    }

    fn description(&self) -> &str {
        "TVMaze show database"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            "search_shows",
            "Search shows by name",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        )]
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "search_shows" => {
                let args: ShowSearchArgs = decode_args(tool, args)?;
                let results = self
                    .provider
                    .search_shows(&args.query)
                    .await
                    .map_err(|e| ToolError::failed(tool, format!("{e:#}")))?;
                encode_result(tool, &ShowSearchResult { results })
            }
            other => Err(ToolError::UnknownTool {
                server: TVMAZE_SERVER.to_string(),
                tool: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchlistArgs {
    user_id: String,
    #[serde(default)]
    status: Option<WatchStatus>,
}

/// Payload of `user-service.get_watchlist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistResult {
    #[serde(default)]
    pub movies: Vec<WatchlistItem>,
}

pub struct UserToolServer {
    store: Arc<WatchlistStore>,
}

impl UserToolServer {
    pub fn new(store: Arc<WatchlistStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolServer for UserToolServer {
    fn name(&self) -> &str {
        USER_SERVER
    }

    fn description(&self) -> &str {
        "Users and watchlists"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(
            "get_watchlist",
            "A user's watchlist, optionally filtered by status",
            json!({
                "type": "object",
                "properties": {
                    "userId": {"type": "string"},
                    "status": {"type": "string", "enum": ["want_to_watch", "watching", "watched"]}
                },
                "required": ["userId"]
            }),
        )]
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        match tool {
            "get_watchlist" => {
                let args: WatchlistArgs = decode_args(tool, args)?;
                self.store
                    .user(&args.user_id)
                    .map_err(|e| ToolError::failed(tool, e))?;
                let movies = self.store.list(&args.user_id, args.status);
                encode_result(tool, &WatchlistResult { movies })
            }
            other => Err(ToolError::UnknownTool {
                server: USER_SERVER.to_string(),
                tool: other.to_string(),
            }),
        }
    }
}
