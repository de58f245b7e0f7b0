pub mod get_blob;
pub mod put_blob;

pub use get_blob::{
    BlobSource, FetchPolicy, GetBlobOperation, GetBlobOperationOutcome, LookupPolicy,
};
pub use put_blob::{PutBlobOperation, PutBlobOperationRequest, PutBlobOperationResult};
