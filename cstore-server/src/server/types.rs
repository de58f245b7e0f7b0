use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PutBlobResponse {
    pub(crate) digest: String,
    pub(crate) size_bytes: u64,
}
