//! Cstore Core - content-addressable blob storage shared across a cluster
//!
//! Blobs are addressed by the SHA256 of their content, kept in memory on the
//! server that stored them, and located on other servers through a shared
//! registry with TTL-based liveness.

pub mod digest;
pub mod error;
pub mod operations;
pub mod peer;
pub mod registry;
pub mod storage;

pub use digest::{DIGEST_LEN, Digest, DigestReader, compute_digest};
pub use error::{CstoreError, Result};
pub use operations::*;
pub use peer::{PeerBlob, PeerFetcher};
pub use registry::{
    CoordinationBackend, MemoryBackend, RedisBackend, Registry, RegistryBuilder, RegistryOptions,
    ServerIdentity,
};
pub use storage::BlobStore;
