use crate::digest::Digest;
use crate::error::{CstoreError, Result};
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

/// Blob retrieved from another server.
#[derive(Debug, Clone)]
pub struct PeerBlob {
    pub hostname: String,
    pub content: Bytes,
}

/// Issues outbound GETs to servers that may hold a digest.
#[derive(Clone)]
pub struct PeerFetcher {
    client: Client,
}

impl PeerFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| CstoreError::Config(format!("failed to build HTTP client: {}", error)))?;

        Ok(Self { client })
    }

    pub fn blob_url(hostname: &str, digest: &Digest) -> String {
        if hostname.starts_with("http://") || hostname.starts_with("https://") {
            format!("{}/{}", hostname.trim_end_matches('/'), digest)
        } else {
            format!("http://{}/{}", hostname, digest)
        }
    }

    /// Try each candidate once, in order, returning the first good copy.
    ///
    /// Failures are logged and move on to the next candidate; there is no
    /// retry beyond a single pass.
    pub async fn fetch_from_peers(&self, digest: &Digest, candidates: &[String]) -> Option<PeerBlob> {
        for hostname in candidates {
            match self.fetch_one(hostname, digest).await {
                Ok(content) => {
                    tracing::debug!("Fetched {} from {}", digest, hostname);
                    return Some(PeerBlob {
                        hostname: hostname.clone(),
                        content,
                    });
                }
                Err(error) => {
                    tracing::warn!("Error fetching {} from {}: {}", digest, hostname, error);
                }
            }
        }

        None
    }

    async fn fetch_one(&self, hostname: &str, digest: &Digest) -> Result<Bytes> {
        let response = self
            .client
            .get(Self::blob_url(hostname, digest))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CstoreError::PeerFetch(format!(
                "peer {} answered {}",
                hostname,
                response.status()
            )));
        }

        let content = response.bytes().await?;
        let actual = Digest::of(&content);
        if actual != *digest {
            return Err(CstoreError::DigestMismatch {
                expected: digest.to_string(),
                actual: actual.to_string(),
            });
        }

        Ok(content)
    }
}
