use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_tmdb")]
    pub tmdb: ProviderConfig,

    #[serde(default = "default_omdb")]
    pub omdb: ProviderConfig,

    #[serde(default = "default_tvmaze")]
    pub tvmaze: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            tmdb: default_tmdb(),
            omdb: default_omdb(),
            tvmaze: default_tvmaze(),
        }
    }
}

/// Connection settings for one upstream catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key (can also be supplied via `<NAME>_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    /// Empty means the provider's public endpoint
    #[serde(default)]
    pub base_url: String,

    /// Response language for catalogs that localize (TMDB)
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Attempts per request including the first (retries on 429/5xx)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

impl ProviderConfig {
    fn with_base_url(base_url: &str) -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            base_url: base_url.to_string(),
            language: default_language(),
            timeout_secs: default_provider_timeout(),
            requests_per_second: default_requests_per_second(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

fn default_tmdb() -> ProviderConfig {
    ProviderConfig::with_base_url("https://api.themoviedb.org/3")
}
fn default_omdb() -> ProviderConfig {
    ProviderConfig::with_base_url("https://www.omdbapi.com")
}
fn default_tvmaze() -> ProviderConfig {
    ProviderConfig::with_base_url("https://api.tvmaze.com")
}
fn default_true() -> bool {
    true
}
fn default_language() -> String {
    "en-US".to_string()
}
fn default_provider_timeout() -> u64 {
    10
}
fn default_requests_per_second() -> u32 {
    4
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_base_delay() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Deadline for each provider call during fan-out
    #[serde(default = "default_fanout_timeout")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,

    #[serde(default = "default_details_ttl")]
    pub details_ttl_secs: u64,
}

fn default_fanout_timeout() -> u64 {
    10
}
fn default_limit() -> usize {
    10
}
fn default_search_ttl() -> u64 {
    1800
}
fn default_details_ttl() -> u64 {
    7200
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_fanout_timeout(),
            default_limit: default_limit(),
            search_ttl_secs: default_search_ttl(),
            details_ttl_secs: default_details_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// When disabled every lookup misses
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// How often expired entries are purged
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_key_prefix() -> String {
    "moviehub".to_string()
}
fn default_max_entries() -> usize {
    10_000
}
fn default_cleanup_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: default_key_prefix(),
            max_entries: default_max_entries(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Empty key disables every LLM feature
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_summary_ttl")]
    pub summary_ttl_secs: u64,
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_summary_ttl() -> u64 {
    86_400
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            summary_ttl_secs: default_summary_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Ask the LLM to classify intent before falling back to rules
    #[serde(default = "default_true")]
    pub llm_intent: bool,

    #[serde(default = "default_intent_timeout")]
    pub intent_timeout_secs: u64,

    /// Deadline for each tool call
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    #[serde(default = "default_recommendations")]
    pub recommendation_count: usize,
}

fn default_intent_timeout() -> u64 {
    15
}
fn default_tool_timeout() -> u64 {
    15
}
fn default_recommendations() -> usize {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            llm_intent: true,
            intent_timeout_secs: default_intent_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            recommendation_count: default_recommendations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Remote gateway to dispatch tool calls through instead of the local registry
    #[serde(default)]
    pub url: Option<String>,

    /// Upstream gateway this node announces its tool servers to
    #[serde(default)]
    pub announce_to: Option<String>,

    /// Address other gateways use to reach this node
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    #[serde(default = "default_register_attempts")]
    pub register_attempts: u32,

    #[serde(default = "default_register_delay")]
    pub register_base_delay_ms: u64,
}

fn default_heartbeat_interval() -> u64 {
    30
}
fn default_health_timeout() -> u64 {
    5
}
fn default_register_attempts() -> u32 {
    5
}
fn default_register_delay() -> u64 {
    2000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            announce_to: None,
            public_url: None,
            heartbeat_interval_secs: default_heartbeat_interval(),
            health_timeout_secs: default_health_timeout(),
            register_attempts: default_register_attempts(),
            register_base_delay_ms: default_register_delay(),
        }
    }
}
