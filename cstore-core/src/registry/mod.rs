//! Registry module for server liveness and digest placement
//!
//! Every server takes a lease (`<ns>:server:<id>`) that a heartbeat keeps
//! alive, and adds its id to `<ns>:blob:<digest>` for each blob it holds.
//! Placement sets are never pruned; lookups drop ids whose lease is gone.

pub mod backend;
pub mod factory;
mod heartbeat;
pub mod memory;
pub mod redis;

use crate::digest::Digest;
use crate::error::{CstoreError, Result};
use heartbeat::Heartbeat;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub use backend::CoordinationBackend;
pub use factory::RegistryBuilder;
pub use memory::MemoryBackend;
pub use self::redis::RedisBackend;

pub const DEFAULT_NAMESPACE: &str = "cstore";
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(20);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Backend connection shared by the registry and its heartbeat task.
pub(crate) type SharedBackend = Arc<Mutex<Box<dyn CoordinationBackend>>>;

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub namespace: String,
    pub lease_ttl: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            lease_ttl: DEFAULT_LEASE_TTL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Identity handed out to this process when it registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub server_id: u64,
    pub hostname: String,
}

struct Registration {
    identity: ServerIdentity,
    heartbeat: Heartbeat,
}

/// Client of the coordination backend.
///
/// All backend commands, reads included, go through a single lock that is
/// held only for one round trip.
pub struct Registry {
    backend: SharedBackend,
    options: RegistryOptions,
    registration: Mutex<Option<Registration>>,
}

impl Registry {
    pub fn new(backend: Box<dyn CoordinationBackend>, options: RegistryOptions) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            options,
            registration: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    fn server_id_generator_key(&self) -> String {
        format!("{}:server_id_generator", self.options.namespace)
    }

    fn server_key(&self, server_id: &str) -> String {
        format!("{}:server:{}", self.options.namespace, server_id)
    }

    fn blob_key(&self, digest: &Digest) -> String {
        format!("{}:blob:{}", self.options.namespace, digest)
    }

    /// Identity of this server while it is registered.
    pub async fn identity(&self) -> Option<ServerIdentity> {
        self.registration
            .lock()
            .await
            .as_ref()
            .map(|registration| registration.identity.clone())
    }

    /// Obtain a fresh server id, write its lease and start the heartbeat.
    pub async fn register_this_server(&self, hostname: &str) -> Result<ServerIdentity> {
        let mut registration = self.registration.lock().await;
        if let Some(current) = registration.as_ref() {
            return Err(CstoreError::ContractViolation(format!(
                "server already registered as {} ({})",
                current.identity.server_id, current.identity.hostname
            )));
        }

        let raw_id = {
            let mut backend = self.backend.lock().await;
            backend.incr(&self.server_id_generator_key()).await?
        };
        let server_id = u64::try_from(raw_id).map_err(|_| {
            CstoreError::Coordination(format!("server id generator returned {}", raw_id))
        })?;

        let lease_key = self.server_key(&server_id.to_string());
        {
            let mut backend = self.backend.lock().await;
            backend
                .set_with_ttl(&lease_key, hostname, self.options.lease_ttl)
                .await?;
        }

        let heartbeat = Heartbeat::spawn(
            self.backend.clone(),
            lease_key,
            hostname.to_string(),
            self.options.lease_ttl,
            self.options.heartbeat_interval,
        );

        let identity = ServerIdentity {
            server_id,
            hostname: hostname.to_string(),
        };
        tracing::info!("Registered server {} as {}", hostname, server_id);

        *registration = Some(Registration {
            identity: identity.clone(),
            heartbeat,
        });

        Ok(identity)
    }

    /// Stop the heartbeat, wait for it, then revoke the lease.
    pub async fn unregister_this_server(&self) -> Result<()> {
        let mut registration = self.registration.lock().await;
        let Some(current) = registration.take() else {
            return Err(CstoreError::ContractViolation(
                "server is not registered".to_string(),
            ));
        };

        current.heartbeat.stop().await;

        let lease_key = self.server_key(&current.identity.server_id.to_string());
        let mut backend = self.backend.lock().await;
        backend.delete(&lease_key).await?;

        tracing::info!(
            "Unregistered server {} ({})",
            current.identity.hostname,
            current.identity.server_id
        );
        Ok(())
    }

    /// Record that this server holds `digest`.
    pub async fn register_digest(&self, digest: &Digest) -> Result<()> {
        let identity = self.identity().await.ok_or_else(|| {
            CstoreError::ContractViolation(format!(
                "cannot register {} before the server is registered",
                digest
            ))
        })?;

        let mut backend = self.backend.lock().await;
        backend
            .set_add(&self.blob_key(digest), &identity.server_id.to_string())
            .await
    }

    /// Hostnames of live servers believed to hold `digest`, in no particular
    /// order.
    pub async fn find_servers(&self, digest: &Digest) -> Result<Vec<String>> {
        let server_ids = {
            let mut backend = self.backend.lock().await;
            backend.set_members(&self.blob_key(digest)).await?
        };
        if server_ids.is_empty() {
            return Ok(Vec::new());
        }

        let lease_keys: Vec<String> = server_ids.iter().map(|id| self.server_key(id)).collect();
        let leases = {
            let mut backend = self.backend.lock().await;
            backend.get_many(&lease_keys).await?
        };

        let mut hostnames = Vec::with_capacity(server_ids.len());
        for (server_id, lease) in server_ids.iter().zip(leases) {
            match lease {
                Some(hostname) => hostnames.push(hostname),
                None => tracing::debug!("Skipping dead server {} for {}", server_id, digest),
            }
        }

        hostnames.sort();
        hostnames.dedup();
        Ok(hostnames)
    }

    /// One arbitrary holder of `digest`.
    ///
    /// Skips the full liveness pass; a picked id whose lease has already gone
    /// resolves to `None` and the caller treats it like a miss.
    pub async fn find_one_server(&self, digest: &Digest) -> Result<Option<String>> {
        let server_id = {
            let mut backend = self.backend.lock().await;
            backend.set_random_member(&self.blob_key(digest)).await?
        };
        let Some(server_id) = server_id else {
            return Ok(None);
        };

        let mut backend = self.backend.lock().await;
        backend.get(&self.server_key(&server_id)).await
    }
}
