//! Tool servers living on other nodes, and announcing ours to an upstream
//! gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::http::{build_client, post_call_tool};
use super::{RegisterRequest, ToolDescriptor, ToolError, ToolServer};
use crate::retry::RetryPolicy;

/// A tool server registered through `POST /register`.
pub struct RemoteToolServer {
    name: String,
    version: String,
    description: String,
    endpoint: String,
    tools: Vec<ToolDescriptor>,
    client: reqwest::Client,
}

impl RemoteToolServer {
    pub fn new(request: RegisterRequest, timeout: Duration) -> Self {
        Self {
            endpoint: request.endpoint.trim_end_matches('/').to_string(),
            name: request.name,
            version: request.version,
            description: request.description,
            tools: request.tools,
            client: build_client(timeout),
        }
    }
}

#[async_trait]
impl ToolServer for RemoteToolServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn endpoint(&self) -> Option<&str> {
        Some(&self.endpoint)
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        self.tools.clone()
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value, ToolError> {
        // The remote node resolves the qualified name against its own registry.
        let qualified = format!("{}.{}", self.name, tool);
        post_call_tool(&self.client, &self.endpoint, &qualified, args).await
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(server = %self.name, error = %e, "Health probe failed");
                false
            }
        }
    }
}

/// Register one server with an upstream gateway.
async fn register_once(
    client: &reqwest::Client,
    upstream: &str,
    request: &RegisterRequest,
) -> anyhow::Result<()> {
    let url = format!("{}/register", upstream.trim_end_matches('/'));
    client
        .post(&url)
        .json(request)
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?
        .error_for_status()
        .with_context(|| format!("{url} rejected registration of {}", request.name))?;
    Ok(())
}

/// Announce every given server to `upstream` in the background, with the
/// given retry policy per server. Servers are advertised at `public_url`.
pub fn spawn_announce(
    servers: Vec<Arc<dyn ToolServer>>,
    upstream: String,
    public_url: String,
    policy: RetryPolicy,
    timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let client = build_client(timeout);
        for server in servers {
            let request = RegisterRequest {
                name: server.name().to_string(),
                version: server.version().to_string(),
                description: server.description().to_string(),
                endpoint: public_url.clone(),
                tools: server.tools(),
            };
            let (client, target, body) = (&client, upstream.as_str(), &request);
            let result = policy
                .run(move |_| register_once(client, target, body), |_| true)
                .await;
            match result {
                Ok(()) => info!(server = %request.name, upstream = %upstream, "Announced tool server"),
                Err(e) => warn!(
                    server = %request.name,
                    upstream = %upstream,
                    attempts = policy.max_attempts,
                    "Giving up on announcing tool server: {:#}",
                    e
                ),
            }
        }
    })
}
