use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "moviehub")]
#[command(author, version, about = "Movie metadata aggregation service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Search every provider and print the aggregated results
    Search {
        /// Search text
        #[arg(required = true)]
        query: String,

        /// Release year filter
        #[arg(long)]
        year: Option<i32>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Sort mode (relevance, year_desc, year_asc, title_az, title_za, votes_desc, votes_asc)
        #[arg(long, default_value = "relevance")]
        sort: String,
    },

    /// Run a natural-language query through the workflow orchestrator
    Execute {
        /// Query text, e.g. "热门电影" or "compare Dune and Arrival"
        #[arg(required = true)]
        query: String,

        /// User whose watchlist informs recommendations
        #[arg(long)]
        user: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
