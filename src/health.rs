//! Backend reachability probes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::transport::{Method, RawResponse, RequestOptions, Transport};

const HEALTH_PATH: &str = "/health";

/// Composite status from [`HealthMonitor::check_system_health`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemHealth {
    pub backend: bool,
    pub database: bool,
    pub assistant: bool,
    pub rag: bool,
    /// Endpoint listing as reported by the backend, when discovery worked
    pub endpoints: Option<Value>,
}

impl SystemHealth {
    pub fn all_ok(&self) -> bool {
        self.backend && self.database && self.assistant && self.rag && self.endpoints.is_some()
    }
}

#[derive(Clone)]
pub struct HealthMonitor {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl HealthMonitor {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// `GET /health`; any failure at all means "offline".
    pub async fn check_connection(&self) -> bool {
        match self
            .transport
            .send(Method::GET, HEALTH_PATH, None, RequestOptions::new())
            .await
        {
            Ok(_) => {
                debug!("backend reachable");
                true
            }
            Err(err) => {
                warn!(error = %err, "backend unreachable");
                false
            }
        }
    }

    async fn probe(&self, resource: &str, options: RequestOptions) -> Result<RawResponse> {
        let path = self.config.api_path(resource);
        self.transport.send(Method::GET, &path, None, options).await
    }

    async fn probe_ok(&self, name: &str, resource: &str, options: RequestOptions) -> bool {
        match self.probe(resource, options).await {
            Ok(_) => {
                info!(subsystem = name, "healthy");
                true
            }
            Err(err) => {
                warn!(subsystem = name, error = %err, "unhealthy");
                false
            }
        }
    }

    async fn probe_all(&self) -> SystemHealth {
        let backend = self.check_connection().await;
        let database = self
            .probe_ok("database", "notes", RequestOptions::new().query("limit", 1))
            .await;
        let assistant = self.probe_ok("assistant", "test", RequestOptions::new()).await;
        let rag = self
            .probe_ok("rag", "rag/status", RequestOptions::new())
            .await;
        let endpoints = match self.probe("endpoints", RequestOptions::new()).await {
            Ok(response) => Some(response.body),
            Err(err) => {
                warn!(subsystem = "endpoints", error = %err, "endpoint discovery failed");
                None
            }
        };

        SystemHealth {
            backend,
            database,
            assistant,
            rag,
            endpoints,
        }
    }

    /// Probe every subsystem independently. Returns `None` only if the probe
    /// sequence itself dies (a panic inside the transport).
    pub async fn check_system_health(&self) -> Option<SystemHealth> {
        let monitor = self.clone();
        match tokio::spawn(async move { monitor.probe_all().await }).await {
            Ok(health) => Some(health),
            Err(err) => {
                warn!(error = %err, "health probe sequence aborted");
                None
            }
        }
    }
}
