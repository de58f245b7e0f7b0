use crate::{BlobStore, CstoreError, Digest, DigestReader, Registry, Result};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;

#[derive(Clone)]
pub struct PutBlobOperation {
    store: Arc<BlobStore>,
    registry: Arc<Registry>,
}

pub struct PutBlobOperationRequest<S> {
    pub digest: Digest,
    pub body: S,
}

#[derive(Debug, Clone)]
pub struct PutBlobOperationResult {
    pub digest: Digest,
    pub size_bytes: u64,
    pub registered: bool,
}

impl PutBlobOperation {
    pub fn new(store: Arc<BlobStore>, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    /// Drain `body` while hashing it and store it only when the computed digest
    /// matches the requested one.
    pub async fn run<S, E>(&self, request: PutBlobOperationRequest<S>) -> Result<PutBlobOperationResult>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let PutBlobOperationRequest { digest, body } = request;

        let mut reader = DigestReader::new(body);
        let mut content = BytesMut::new();
        while let Some(chunk) = reader.next().await {
            let chunk = chunk.map_err(|error| CstoreError::Io(std::io::Error::other(error)))?;
            content.extend_from_slice(&chunk);
        }

        let actual = reader.digest();
        if actual != digest {
            return Err(CstoreError::DigestMismatch {
                expected: digest.to_string(),
                actual: actual.to_string(),
            });
        }

        let size_bytes = content.len() as u64;
        self.store.put(digest.clone(), content.freeze()).await;

        tracing::info!("Registering {} ({} bytes)", digest, size_bytes);
        let registered = match self.registry.register_digest(&digest).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Unable to register {}: {}", digest, error);
                false
            }
        };

        Ok(PutBlobOperationResult {
            digest,
            size_bytes,
            registered,
        })
    }
}
