use cstore_core::{CstoreError, FetchPolicy, LookupPolicy, RegistryBuilder, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Coordination backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            namespace: default_namespace(),
            lease_ttl_secs: default_lease_ttl_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

fn default_registry_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_namespace() -> String {
    "cstore".to_string()
}

fn default_lease_ttl_secs() -> u64 {
    20
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub lookup: LookupPolicy,
    #[serde(default = "default_register_fetched")]
    pub register_fetched: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lookup: LookupPolicy::default(),
            register_fetched: default_register_fetched(),
            timeout_secs: None,
        }
    }
}

fn default_register_fetched() -> bool {
    true
}

impl Config {
    /// Load from an optional file, then `CSTORE_*` environment variables
    /// (`CSTORE_REGISTRY__URL`, `CSTORE_FETCH__LOOKUP`, ...).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("CSTORE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| CstoreError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| CstoreError::Config(e.to_string()))?;

        Ok(config)
    }

    pub fn registry_builder(&self) -> RegistryBuilder {
        RegistryBuilder::new()
            .url(self.registry.url.clone())
            .namespace(self.registry.namespace.clone())
            .lease_ttl(Duration::from_secs(self.registry.lease_ttl_secs))
            .heartbeat_interval(Duration::from_secs(self.registry.heartbeat_interval_secs))
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            lookup: self.fetch.lookup,
            register_fetched: self.fetch.register_fetched,
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch.timeout_secs.map(Duration::from_secs)
    }
}
