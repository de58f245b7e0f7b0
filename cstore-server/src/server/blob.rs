use super::{PutBlobResponse, ServerState, response_error};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use cstore_core::{
    BlobSource, CstoreError, Digest, GetBlobOperationOutcome, PutBlobOperationRequest,
};
use std::sync::Arc;

pub(crate) async fn get_blob(
    State(state): State<Arc<ServerState>>,
    Path(raw_digest): Path<String>,
) -> Response {
    tracing::debug!("GET /{}", raw_digest);

    let digest = match Digest::parse(&raw_digest) {
        Ok(digest) => digest,
        Err(error) => return response_error(StatusCode::FORBIDDEN, error.to_string()),
    };

    match state.get_blob_operation.run(&digest).await {
        GetBlobOperationOutcome::Found { content, source } => {
            if let BlobSource::Peer(hostname) = &source {
                tracing::debug!("Served {} from {}", digest, hostname);
            }

            let mut response = Response::new(Body::from(content));
            *response.status_mut() = StatusCode::OK;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            response
        }
        GetBlobOperationOutcome::NotFound => {
            response_error(StatusCode::NOT_FOUND, format!("{} not found", digest))
        }
    }
}

pub(crate) async fn put_blob(
    State(state): State<Arc<ServerState>>,
    Path(raw_digest): Path<String>,
    body: Body,
) -> Response {
    tracing::debug!("PUT /{}", raw_digest);

    let digest = match Digest::parse(&raw_digest) {
        Ok(digest) => digest,
        Err(error) => return response_error(StatusCode::FORBIDDEN, error.to_string()),
    };

    let result = state
        .put_blob_operation
        .run(PutBlobOperationRequest {
            digest,
            body: body.into_data_stream(),
        })
        .await;

    match result {
        Ok(result) => (
            StatusCode::CREATED,
            Json(PutBlobResponse {
                digest: result.digest.to_string(),
                size_bytes: result.size_bytes,
            }),
        )
            .into_response(),
        Err(error @ CstoreError::DigestMismatch { .. }) => {
            response_error(StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(CstoreError::Io(error)) => {
            tracing::warn!("Could not read payload for {}: {}", raw_digest, error);
            response_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not read payload")
        }
        Err(error) => response_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

/// Any verb other than GET or PUT on a single-segment path.
pub(crate) async fn unsupported_method(Path(raw_digest): Path<String>) -> Response {
    match Digest::parse(&raw_digest) {
        Ok(_) => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Err(error) => response_error(StatusCode::FORBIDDEN, error.to_string()),
    }
}

/// Paths that are not `/<digest>` at all.
pub(crate) async fn invalid_path(uri: Uri) -> Response {
    response_error(
        StatusCode::FORBIDDEN,
        format!("Invalid resource path: {}", uri.path()),
    )
}
