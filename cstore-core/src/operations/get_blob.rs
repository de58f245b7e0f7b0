use crate::{BlobStore, Digest, PeerFetcher, Registry, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How holders are looked up when a blob is not stored locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupPolicy {
    /// Every live holder, tried in turn.
    #[default]
    All,
    /// A single arbitrary holder, without the liveness pass.
    One,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub lookup: LookupPolicy,
    /// Advertise this server as a holder after caching a fetched blob.
    pub register_fetched: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            lookup: LookupPolicy::All,
            register_fetched: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobSource {
    Local,
    Peer(String),
}

#[derive(Debug, Clone)]
pub enum GetBlobOperationOutcome {
    Found { content: Bytes, source: BlobSource },
    NotFound,
}

#[derive(Clone)]
pub struct GetBlobOperation {
    store: Arc<BlobStore>,
    registry: Arc<Registry>,
    fetcher: PeerFetcher,
    policy: FetchPolicy,
}

impl GetBlobOperation {
    pub fn new(
        store: Arc<BlobStore>,
        registry: Arc<Registry>,
        fetcher: PeerFetcher,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
            policy,
        }
    }

    /// Serve from the local store, falling back to peers that hold `digest`.
    ///
    /// A fetched blob is cached locally before it is returned.
    pub async fn run(&self, digest: &Digest) -> GetBlobOperationOutcome {
        if let Some(content) = self.store.get(digest).await {
            return GetBlobOperationOutcome::Found {
                content,
                source: BlobSource::Local,
            };
        }

        let candidates = self.candidates(digest).await;
        if candidates.is_empty() {
            tracing::debug!("Can't find server with digest {}", digest);
            return GetBlobOperationOutcome::NotFound;
        }

        let Some(fetched) = self.fetcher.fetch_from_peers(digest, &candidates).await else {
            return GetBlobOperationOutcome::NotFound;
        };

        self.store
            .put(digest.clone(), fetched.content.clone())
            .await;

        if self.policy.register_fetched {
            tracing::info!("Registering cached copy of {}", digest);
            if let Err(error) = self.registry.register_digest(digest).await {
                tracing::warn!("Unable to register {}: {}", digest, error);
            }
        }

        GetBlobOperationOutcome::Found {
            content: fetched.content,
            source: BlobSource::Peer(fetched.hostname),
        }
    }

    async fn candidates(&self, digest: &Digest) -> Vec<String> {
        let lookup: Result<Vec<String>> = match self.policy.lookup {
            LookupPolicy::All => self.registry.find_servers(digest).await,
            LookupPolicy::One => self
                .registry
                .find_one_server(digest)
                .await
                .map(|server| server.into_iter().collect()),
        };

        let mut candidates = match lookup {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::warn!("Error checking registry for {}: {}", digest, error);
                return Vec::new();
            }
        };

        if let Some(identity) = self.registry.identity().await {
            candidates.retain(|hostname| *hostname != identity.hostname);
        }
        candidates
    }
}
