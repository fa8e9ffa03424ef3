//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] from a config
//! whose upstreams are either disabled or pointed at wiremock servers. Requests
//! go through the router with `oneshot`; [`TestHarness::with_server`] binds
//! a random port for tests that need real TCP.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use moviehub::config::Config;
use moviehub::server::{create_router, AppContext};
use serde_json::Value;
use tower::ServiceExt;

/// A config with every upstream disabled and no LLM.
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.providers.tmdb.enabled = false;
    config.providers.omdb.enabled = false;
    config.providers.tvmaze.enabled = false;
    config.llm.api_key.clear();
    config.orchestrator.tool_timeout_secs = 5;
    config
}

/// Point TMDB at `uri` with a test key.
pub fn with_tmdb(mut config: Config, uri: &str) -> Config {
    config.providers.tmdb.enabled = true;
    config.providers.tmdb.api_key = "test-key".into();
    config.providers.tmdb.base_url = uri.to_string();
    config.providers.tmdb.retry_attempts = 1;
    config
}

/// Point TVMaze at `uri`.
pub fn with_tvmaze(mut config: Config, uri: &str) -> Config {
    config.providers.tvmaze.enabled = true;
    config.providers.tvmaze.base_url = uri.to_string();
    config.providers.tvmaze.retry_attempts = 1;
    config
}

/// Point the LLM client at `uri`.
pub fn with_llm(mut config: Config, uri: &str) -> Config {
    config.llm.api_key = "sk-test".into();
    config.llm.base_url = uri.to_string();
    config
}

pub struct TestHarness {
    pub ctx: AppContext,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(offline_config())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            ctx: AppContext::from_config(config),
        }
    }

    /// Send one request through a fresh router and decode the JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = create_router(self.ctx.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let text = body_to_string(response.into_body()).await;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}

/// Helper to get response body as string
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
