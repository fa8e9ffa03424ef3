//! In-process tool registry and heartbeat.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{error, info, warn};

use super::{
    parse_qualified_name, ServerInfo, ServerStatus, ToolDescriptor, ToolError, ToolGateway,
    ToolServer,
};

struct Entry {
    server: Arc<dyn ToolServer>,
    status: ServerStatus,
    last_heartbeat: DateTime<Utc>,
}

/// Registered tool servers, in registration order.
///
/// Registering a server under an existing name replaces it.
#[derive(Default)]
pub struct ToolRegistry {
    servers: RwLock<Vec<Entry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, server: Arc<dyn ToolServer>) {
        let entry = Entry {
            status: ServerStatus::Online,
            last_heartbeat: Utc::now(),
            server,
        };
        let name = entry.server.name().to_string();
        let mut servers = self.servers.write();
        match servers.iter().position(|e| e.server.name() == name) {
            Some(idx) => servers[idx] = entry,
            None => servers.push(entry),
        }
        info!(server = %name, "Registered tool server");
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ToolServer>> {
        self.servers
            .read()
            .iter()
            .find(|e| e.server.name() == name)
            .map(|e| e.server.clone())
    }

    pub fn list(&self) -> Vec<ServerInfo> {
        self.servers
            .read()
            .iter()
            .map(|e| ServerInfo {
                name: e.server.name().to_string(),
                version: e.server.version().to_string(),
                description: e.server.description().to_string(),
                endpoint: e.server.endpoint().map(str::to_string),
                status: e.status,
                tool_count: e.server.tools().len(),
                last_heartbeat: e.last_heartbeat,
            })
            .collect()
    }

    /// Every tool of every server, tagged with its server name.
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.servers
            .read()
            .iter()
            .flat_map(|e| {
                let server = e.server.name().to_string();
                e.server.tools().into_iter().map(move |mut t| {
                    t.server = Some(server.clone());
                    t
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }

    /// Record a probe result. Returns the previous status when it changed.
    pub fn set_status(&self, name: &str, status: ServerStatus) -> Option<ServerStatus> {
        let mut servers = self.servers.write();
        let entry = servers.iter_mut().find(|e| e.server.name() == name)?;
        if status == ServerStatus::Online {
            entry.last_heartbeat = Utc::now();
        }
        let previous = entry.status;
        entry.status = status;
        (previous != status).then_some(previous)
    }

    fn snapshot(&self) -> Vec<Arc<dyn ToolServer>> {
        self.servers.read().iter().map(|e| e.server.clone()).collect()
    }

    /// Probe every server once.
    pub async fn check_health(&self, probe_timeout: Duration) {
        let servers = self.snapshot();
        let probes = servers.iter().map(|server| async move {
            let healthy = tokio::time::timeout(probe_timeout, server.health())
                .await
                .unwrap_or(false);
            (server.name().to_string(), healthy)
        });

        for (name, healthy) in join_all(probes).await {
            let status = if healthy {
                ServerStatus::Online
            } else {
                ServerStatus::Offline
            };
            match self.set_status(&name, status) {
                Some(_) if healthy => info!(server = %name, "Tool server is back online"),
                Some(_) => warn!(server = %name, "Tool server is offline"),
                None => {}
            }
        }
    }
}

#[async_trait]
impl ToolGateway for ToolRegistry {
    async fn call_tool(&self, qualified_name: &str, args: Value) -> Result<Value, ToolError> {
        let (server_name, tool) = parse_qualified_name(qualified_name)?;
        let server = self
            .lookup(server_name)
            .ok_or_else(|| ToolError::UnknownServer(server_name.to_string()))?;

        if !server.tools().iter().any(|t| t.name == tool) {
            return Err(ToolError::UnknownTool {
                server: server_name.to_string(),
                tool: tool.to_string(),
            });
        }

        server.call(tool, args).await.map_err(|e| {
            error!(tool = qualified_name, error = %e, "Tool call failed");
            e
        })
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(self.tools())
    }
}

/// Spawn the supervised heartbeat loop.
pub fn spawn_heartbeat(
    registry: Arc<ToolRegistry>,
    interval: Duration,
    probe_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; servers were just registered.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            registry.check_health(probe_timeout).await;
        }
    })
}
