//! Tool-call gateway.
//!
//! Provider capabilities are exposed as named tools grouped under tool
//! servers (`tmdb-provider.search_movies`). The workflow orchestrator only
//! talks to a [`ToolGateway`], so it never needs to know whether a tool runs
//! in-process, on a registered remote node, or behind another gateway.

pub mod http;
pub mod local;
pub mod registry;
pub mod remote;

pub use http::HttpToolGateway;
pub use registry::{spawn_heartbeat, ToolRegistry};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A tool a server offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
    /// Owning server, filled in when tools are listed across servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            server: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
}

/// Summary of a registered tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub status: ServerStatus,
    pub tool_count: usize,
    pub last_heartbeat: DateTime<Utc>,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub endpoint: String,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Body of `POST /call-tool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
}

/// Reply of `POST /call-tool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid tool name format: {0}. Expected format: serverName.toolName")]
    InvalidName(String),

    #[error("server {0} not found")]
    UnknownServer(String),

    #[error("tool {tool} not found in server {server}")]
    UnknownTool { server: String, tool: String },

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    #[error("gateway request failed: {0}")]
    Gateway(String),
}

impl ToolError {
    pub fn failed(tool: &str, err: impl std::fmt::Display) -> Self {
        ToolError::Failed {
            tool: tool.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the caller addressed something that does not exist.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ToolError::InvalidName(_) | ToolError::UnknownServer(_) | ToolError::UnknownTool { .. }
        )
    }
}

/// Split `server.tool` into its two non-empty halves.
pub fn parse_qualified_name(name: &str) -> Result<(&str, &str), ToolError> {
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(server), Some(tool), None) if !server.is_empty() && !tool.is_empty() => {
            Ok((server, tool))
        }
        _ => Err(ToolError::InvalidName(name.to_string())),
    }
}

/// Decode a tool's JSON arguments into its typed argument struct.
pub fn decode_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Encode a tool's typed result.
pub fn encode_result<T: Serialize>(tool: &str, value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::failed(tool, e))
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A named group of tools.
#[async_trait]
pub trait ToolServer: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str;

    /// Where the server lives, for remote servers.
    fn endpoint(&self) -> Option<&str> {
        None
    }

    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Run one of this server's tools by its unqualified name.
    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError>;

    /// Liveness probe used by the heartbeat.
    async fn health(&self) -> bool {
        true
    }
}

/// Dispatches `server.tool` calls.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn call_tool(&self, qualified_name: &str, args: Value) -> Result<Value, ToolError>;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;
}
