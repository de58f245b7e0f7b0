//! Local blob storage.
//!
//! Content lives only in process memory and is lost on restart.

pub mod blob_store;

pub use blob_store::BlobStore;
