use std::sync::Arc;

use crate::cache::{NoteCache, SharedCache};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::health::HealthMonitor;
use crate::orchestrator::NoteOrchestrator;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Transport};

/// Everything a client process needs, built once at startup.
///
/// Owns the session's single [`NoteCache`]; components receive it explicitly.
pub struct Session {
    config: ClientConfig,
    cache: SharedCache,
    notes: NoteOrchestrator,
    health: HealthMonitor,
    retry: RetryPolicy,
}

impl Session {
    /// Connect over HTTP using `config`. Fails on an unusable base URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = NoteCache::shared();
        let notes = NoteOrchestrator::new(transport.clone(), cache.clone(), config.clone());
        let health = HealthMonitor::new(transport, config.clone());
        let retry = RetryPolicy::from_settings(&config.retry);

        Self {
            config,
            cache,
            notes,
            health,
            retry,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn notes(&self) -> &NoteOrchestrator {
        &self.notes
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
