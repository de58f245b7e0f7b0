use thiserror::Error;

pub type Result<T> = std::result::Result<T, CstoreError>;

#[derive(Error, Debug)]
pub enum CstoreError {
    #[error("Invalid resource path: {0}")]
    InvalidDigest(String),

    #[error("SHA256 digest does not match content: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Coordination error: {0}")]
    Coordination(String),

    #[error("Peer fetch error: {0}")]
    PeerFetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<redis::RedisError> for CstoreError {
    fn from(err: redis::RedisError) -> Self {
        CstoreError::Coordination(err.to_string())
    }
}

impl From<reqwest::Error> for CstoreError {
    fn from(err: reqwest::Error) -> Self {
        CstoreError::PeerFetch(err.to_string())
    }
}
