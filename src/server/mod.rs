use crate::cache::{start_cleanup_task, CacheManager, MemoryCache};
use crate::config::Config;
use crate::llm::{LlmClient, LlmIntentClassifier, Summarizer};
use crate::metadata::aggregation::AggregationService;
use crate::metadata::ProviderSet;
use crate::orchestrator::WorkflowOrchestrator;
use crate::retry::RetryPolicy;
use crate::tools::remote::spawn_announce;
use crate::tools::{local::local_servers, spawn_heartbeat, HttpToolGateway, ToolGateway, ToolRegistry};
use crate::watchlist::WatchlistStore;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_api;
pub mod routes_cache;
pub mod routes_gateway;
pub mod routes_llm;
pub mod routes_watchlist;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub aggregation: AggregationService,
    pub cache: CacheManager,
    pub watchlist: Arc<WatchlistStore>,
    /// Tool servers hosted or registered on this node
    pub tools: Arc<ToolRegistry>,
    pub orchestrator: Arc<WorkflowOrchestrator>,
    /// Absent when no LLM API key is configured
    pub summarizer: Option<Summarizer>,
    /// Backing store, kept for the periodic cleanup task
    pub memory_cache: Option<Arc<MemoryCache>>,
}

impl AppContext {
    /// Wire every service from configuration.
    pub fn from_config(config: Config) -> Self {
        let (cache, memory_cache) = CacheManager::from_config(&config.cache);
        let providers = ProviderSet::from_config(&config.providers);
        let aggregation =
            AggregationService::new(providers.registry(), cache.clone(), &config.aggregation);
        let watchlist = Arc::new(WatchlistStore::new());

        let tools = Arc::new(ToolRegistry::new());
        for server in local_servers(&providers, watchlist.clone()) {
            tools.register(server);
        }

        let tool_timeout = Duration::from_secs(config.orchestrator.tool_timeout_secs);
        let gateway: Arc<dyn ToolGateway> = match &config.gateway.url {
            Some(url) => {
                tracing::info!(gateway = %url, "Dispatching tool calls through remote gateway");
                Arc::new(HttpToolGateway::new(url, tool_timeout))
            }
            None => tools.clone(),
        };

        let llm = config
            .llm
            .is_configured()
            .then(|| Arc::new(LlmClient::new(&config.llm)));

        let mut orchestrator = WorkflowOrchestrator::new(gateway, &config.orchestrator);
        match &llm {
            Some(client) if config.orchestrator.llm_intent => {
                orchestrator =
                    orchestrator.with_classifier(Arc::new(LlmIntentClassifier::new(client.clone())));
            }
            Some(_) => tracing::info!("LLM intent classification disabled; using keyword rules"),
            None => tracing::info!("No LLM configured; intent falls back to keyword rules"),
        }

        let summarizer = llm.map(|client| {
            Summarizer::new(
                client,
                cache.clone(),
                Duration::from_secs(config.llm.summary_ttl_secs),
            )
        });

        Self {
            config: Arc::new(config),
            aggregation,
            cache,
            watchlist,
            tools,
            orchestrator: Arc::new(orchestrator),
            summarizer,
            memory_cache,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = routes_api::api_routes()
        .merge(routes_llm::llm_routes())
        .merge(routes_watchlist::watchlist_routes())
        .merge(routes_cache::cache_routes());

    Router::new()
        .route("/health", axum::routing::get(routes_api::health))
        .nest("/api", api)
        .merge(routes_gateway::gateway_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the background tasks and serve until a shutdown signal arrives.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(config);
    let gateway = &ctx.config.gateway;

    let mut tasks = Vec::new();
    if let Some(memory) = &ctx.memory_cache {
        tasks.push(start_cleanup_task(
            memory.clone(),
            ctx.config.cache.cleanup_interval_secs,
        ));
    }
    tasks.push(spawn_heartbeat(
        ctx.tools.clone(),
        Duration::from_secs(gateway.heartbeat_interval_secs),
        Duration::from_secs(gateway.health_timeout_secs),
    ));
    if let (Some(upstream), Some(public_url)) = (&gateway.announce_to, &gateway.public_url) {
        let servers = ctx
            .tools
            .list()
            .iter()
            .filter(|info| info.endpoint.is_none())
            .filter_map(|info| ctx.tools.lookup(&info.name))
            .collect();
        tasks.push(spawn_announce(
            servers,
            upstream.clone(),
            public_url.clone(),
            RetryPolicy::new(
                gateway.register_attempts,
                Duration::from_millis(gateway.register_base_delay_ms),
            ),
            Duration::from_secs(gateway.health_timeout_secs),
        ));
    }

    tracing::info!(
        tool_servers = ctx.tools.len(),
        providers = ?ctx.aggregation.providers().names(),
        llm = ctx.summarizer.is_some(),
        "Services initialized"
    );

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in tasks {
        task.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
