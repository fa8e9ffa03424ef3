mod cli;

use moviehub::{
    config,
    metadata::aggregation::SearchRequest,
    server::{self, AppContext},
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use moviehub_common::SortMode;
use std::path::Path;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting moviehub server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

async fn search(
    query: String,
    year: Option<i32>,
    limit: Option<usize>,
    sort: &str,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ctx = AppContext::from_config(config);

    let request = SearchRequest {
        query,
        year,
        limit,
        sort: SortMode::parse_lenient(sort),
        ..Default::default()
    };
    let response = ctx.aggregation.search(&request).await?;

    for provider in response.providers.iter().filter(|p| !p.success) {
        tracing::warn!(
            provider = %provider.source,
            error = provider.error.as_deref().unwrap_or("unknown"),
            "Provider failed"
        );
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn execute(query: String, user: Option<String>, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ctx = AppContext::from_config(config);

    let response = ctx.orchestrator.execute(&query, user.as_deref()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.success {
        anyhow::bail!(
            "Workflow failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "moviehub=trace,moviehub_common=trace,tower_http=debug".to_string()
        } else {
            "moviehub=debug,moviehub_common=debug,tower_http=info".to_string()
        }
    });

    // stdout carries command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, config_path))
        }
        Commands::Search {
            query,
            year,
            limit,
            sort,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(search(query, year, limit, &sort, config_path))
        }
        Commands::Execute { query, user } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(execute(query, user, config_path))
        }
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("moviehub {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, showing built-in defaults");
            config::Config::default()
        }
    };
    print_config_summary(&config);
    Ok(())
}

fn print_config_summary(config: &config::Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    let providers = [
        ("tmdb", &config.providers.tmdb),
        ("omdb", &config.providers.omdb),
        ("tvmaze", &config.providers.tvmaze),
    ];
    for (name, provider) in providers {
        println!(
            "  Provider {}: {}{}",
            name,
            if provider.enabled { "enabled" } else { "disabled" },
            if provider.api_key.is_empty() { "" } else { " (key set)" }
        );
    }
    println!("  Cache enabled: {}", config.cache.enabled);
    println!("  LLM configured: {}", config.llm.is_configured());
    if let Some(url) = &config.gateway.url {
        println!("  Remote gateway: {}", url);
    }
}
