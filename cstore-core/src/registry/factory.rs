use super::{
    CoordinationBackend, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_LEASE_TTL, DEFAULT_NAMESPACE,
    MemoryBackend, RedisBackend, Registry, RegistryOptions,
};
use crate::{CstoreError, Result};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BackendTarget {
    Redis(String),
    Memory,
}

#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    url: Option<String>,
    namespace: Option<String>,
    lease_ttl: Option<Duration>,
    heartbeat_interval: Option<Duration>,
    memory_backend: Option<MemoryBackend>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend url: `redis://`, `rediss://` or `memory://`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = Some(ttl);
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = Some(interval);
        self
    }

    /// Share an existing in-process keyspace when the url is `memory://`.
    pub fn memory_backend(mut self, backend: MemoryBackend) -> Self {
        self.memory_backend = Some(backend);
        self
    }

    fn resolve_target(&self) -> Result<BackendTarget> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CstoreError::Config("registry url cannot be empty".to_string()))?;

        if url.starts_with("redis://") || url.starts_with("rediss://") {
            return Ok(BackendTarget::Redis(url.to_string()));
        }

        if url.starts_with("memory://") {
            return Ok(BackendTarget::Memory);
        }

        Err(CstoreError::Config(format!(
            "unsupported registry url '{}': expected redis://, rediss:// or memory://",
            url
        )))
    }

    fn resolve_options(&self) -> Result<RegistryOptions> {
        let namespace = self
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_NAMESPACE)
            .trim()
            .to_string();
        if namespace.is_empty() {
            return Err(CstoreError::Config(
                "registry namespace cannot be empty".to_string(),
            ));
        }

        let lease_ttl = self.lease_ttl.unwrap_or(DEFAULT_LEASE_TTL);
        let heartbeat_interval = self.heartbeat_interval.unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);
        if heartbeat_interval.is_zero() || heartbeat_interval >= lease_ttl {
            return Err(CstoreError::Config(format!(
                "heartbeat interval {:?} must be non-zero and shorter than lease ttl {:?}",
                heartbeat_interval, lease_ttl
            )));
        }

        Ok(RegistryOptions {
            namespace,
            lease_ttl,
            heartbeat_interval,
        })
    }

    pub async fn build(self) -> Result<Registry> {
        let options = self.resolve_options()?;
        let backend: Box<dyn CoordinationBackend> = match self.resolve_target()? {
            BackendTarget::Redis(url) => {
                tracing::info!("Using Redis registry at {}", url);
                Box::new(RedisBackend::connect(&url).await?)
            }
            BackendTarget::Memory => {
                tracing::info!("Using in-process registry");
                Box::new(self.memory_backend.unwrap_or_default())
            }
        };

        Ok(Registry::new(backend, options))
    }
}
