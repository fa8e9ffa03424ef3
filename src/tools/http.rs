//! HTTP client side of the gateway protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{ToolCallRequest, ToolCallResponse, ToolDescriptor, ToolError, ToolGateway};

pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build gateway HTTP client with timeout: {}", e);
            reqwest::Client::new()
        })
}

/// POST a qualified tool call to `<base_url>/call-tool`.
pub(crate) async fn post_call_tool(
    client: &reqwest::Client,
    base_url: &str,
    qualified_name: &str,
    args: Value,
) -> Result<Value, ToolError> {
    let url = format!("{}/call-tool", base_url.trim_end_matches('/'));
    let request = ToolCallRequest {
        tool_name: qualified_name.to_string(),
        args,
    };

    let resp = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| ToolError::Gateway(format!("{url}: {e}")))?;
    let status = resp.status();

    // Error replies still carry the `{success, error}` envelope.
    let body: ToolCallResponse = resp
        .json()
        .await
        .map_err(|e| ToolError::Gateway(format!("{url} returned {status} with invalid body: {e}")))?;

    match body {
        ToolCallResponse {
            success: true,
            result,
            ..
        } => Ok(result.unwrap_or(Value::Null)),
        ToolCallResponse { error, .. } => Err(ToolError::failed(
            qualified_name,
            error.unwrap_or_else(|| format!("gateway returned {status}")),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct ToolList {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

/// A [`ToolGateway`] that forwards every call to a remote gateway node.
pub struct HttpToolGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpToolGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    async fn call_tool(&self, qualified_name: &str, args: Value) -> Result<Value, ToolError> {
        super::parse_qualified_name(qualified_name)?;
        post_call_tool(&self.client, &self.base_url, qualified_name, args).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let url = format!("{}/tools", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ToolError::Gateway(format!("{url}: {e}")))?;
        let list: ToolList = resp
            .json()
            .await
            .map_err(|e| ToolError::Gateway(format!("{url}: {e}")))?;
        Ok(list.tools)
    }
}
