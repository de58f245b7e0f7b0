use crate::digest::Digest;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// BlobStore maps digests to content for a single server.
///
/// Readers proceed concurrently; a writer holds the lock only for the single
/// map mutation, so no reader observes a partial write.
#[derive(Default)]
pub struct BlobStore {
    blobs: RwLock<HashMap<Digest, Bytes>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the content stored under `digest`.
    pub async fn put(&self, digest: Digest, content: Bytes) {
        let mut blobs = self.blobs.write().await;
        blobs.insert(digest, content);
    }

    pub async fn get(&self, digest: &Digest) -> Option<Bytes> {
        let blobs = self.blobs.read().await;
        blobs.get(digest).cloned()
    }

    pub async fn contains(&self, digest: &Digest) -> bool {
        self.blobs.read().await.contains_key(digest)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}
