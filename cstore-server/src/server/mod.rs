use crate::config::Config;
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use cstore_core::{
    BlobStore, FetchPolicy, GetBlobOperation, PeerFetcher, PutBlobOperation, Registry, Result,
};
use std::sync::Arc;
use tokio::net::TcpListener;

mod blob;
mod types;

use blob::{get_blob, invalid_path, put_blob, unsupported_method};
pub(crate) use types::*;

pub struct ServerState {
    pub(crate) get_blob_operation: GetBlobOperation,
    pub(crate) put_blob_operation: PutBlobOperation,
}

impl ServerState {
    pub fn new(registry: Arc<Registry>, fetcher: PeerFetcher, policy: FetchPolicy) -> Self {
        let store = Arc::new(BlobStore::new());
        Self {
            get_blob_operation: GetBlobOperation::new(
                store.clone(),
                registry.clone(),
                fetcher,
                policy,
            ),
            put_blob_operation: PutBlobOperation::new(store, registry),
        }
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/:digest",
            get(get_blob).put(put_blob).fallback(unsupported_method),
        )
        .fallback(invalid_path)
        .with_state(state)
}

/// Register with the cluster, serve until Ctrl-C, then unregister.
///
/// `advertise_addr` is the hostname peers use to reach this server.
pub async fn run_server(config: Config, listen_addr: &str, advertise_addr: &str) -> Result<()> {
    let registry = Arc::new(config.registry_builder().build().await?);
    let fetcher = PeerFetcher::new(config.fetch_timeout())?;
    let state = Arc::new(ServerState::new(
        registry.clone(),
        fetcher,
        config.fetch_policy(),
    ));

    let listener = TcpListener::bind(listen_addr).await?;
    registry.register_this_server(advertise_addr).await?;

    tracing::info!("Serving on http://{}/", listen_addr);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(error) = registry.unregister_this_server().await {
        tracing::warn!("Failed to unregister server: {}", error);
    }

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

pub(crate) fn response_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cstore_core::{Digest, MemoryBackend, RegistryBuilder};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    struct TestServer {
        addr: SocketAddr,
        registry: Arc<Registry>,
        handle: JoinHandle<()>,
    }

    impl TestServer {
        async fn spawn(backend: &MemoryBackend) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("local addr");

            let registry = Arc::new(
                RegistryBuilder::new()
                    .url("memory://")
                    .memory_backend(backend.clone())
                    .build()
                    .await
                    .expect("registry"),
            );
            registry
                .register_this_server(&addr.to_string())
                .await
                .expect("register");

            let fetcher = PeerFetcher::new(Some(Duration::from_secs(5))).expect("fetcher");
            let state = Arc::new(ServerState::new(
                registry.clone(),
                fetcher,
                FetchPolicy::default(),
            ));
            let app = router(state);
            let handle = tokio::spawn(async move {
                axum::serve(listener, app).await.expect("serve");
            });

            Self {
                addr,
                registry,
                handle,
            }
        }

        fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        async fn stop(self) {
            self.handle.abort();
            let _ = self.handle.await;
            self.registry
                .unregister_this_server()
                .await
                .expect("unregister");
        }
    }

    async fn put(client: &reqwest::Client, url: &str, body: &'static str) -> reqwest::StatusCode {
        client
            .put(url)
            .body(body)
            .send()
            .await
            .expect("put")
            .status()
    }

    async fn get_status(client: &reqwest::Client, url: &str) -> reqwest::StatusCode {
        client.get(url).send().await.expect("get").status()
    }

    #[tokio::test]
    async fn serves_single_server_requests() {
        let backend = MemoryBackend::new();
        let server = TestServer::spawn(&backend).await;
        let client = reqwest::Client::new();

        let data = "Testing!";
        let digest = Digest::of(data.as_bytes());
        let url = server.url(&format!("/{}", digest));

        assert_eq!(get_status(&client, &server.url("/foo")).await, 403);
        assert_eq!(get_status(&client, &server.url("/---")).await, 403);
        assert_eq!(get_status(&client, &server.url("/")).await, 403);
        assert_eq!(get_status(&client, &server.url("/a/b")).await, 403);
        assert_eq!(
            get_status(&client, &server.url(&format!("/{}", digest.as_str().to_uppercase()))).await,
            403
        );

        assert_eq!(get_status(&client, &url).await, 404);

        assert_eq!(put(&client, &server.url("/foo"), data).await, 403);
        assert_eq!(put(&client, &url, "not the content").await, 400);
        assert_eq!(get_status(&client, &url).await, 404);

        assert_eq!(put(&client, &url, data).await, 201);

        let response = client.get(&url).send().await.expect("get");
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.expect("body"), data);

        let response = client.post(&url).send().await.expect("post");
        assert_eq!(response.status(), 405);
        let response = client
            .delete(server.url("/foo"))
            .send()
            .await
            .expect("delete");
        assert_eq!(response.status(), 403);

        server.stop().await;
    }

    #[tokio::test]
    async fn resolves_blobs_through_peers() {
        let backend = MemoryBackend::new();
        let first = TestServer::spawn(&backend).await;
        let second = TestServer::spawn(&backend).await;
        let client = reqwest::Client::new();

        let data = "Testing!";
        let digest = Digest::of(data.as_bytes());

        assert_eq!(put(&client, &first.url(&format!("/{}", digest)), data).await, 201);

        let response = client
            .get(second.url(&format!("/{}", digest)))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.expect("body"), data);

        let mut holders = second.registry.find_servers(&digest).await.expect("find");
        holders.sort();
        let mut expected = vec![first.addr.to_string(), second.addr.to_string()];
        expected.sort();
        assert_eq!(holders, expected);

        let first_addr = first.addr.to_string();
        first.stop().await;

        let holders = second.registry.find_servers(&digest).await.expect("find");
        assert!(!holders.contains(&first_addr));

        let response = client
            .get(second.url(&format!("/{}", digest)))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.expect("body"), data);

        second.stop().await;
    }

    #[tokio::test]
    async fn unknown_digest_is_not_found_across_cluster() {
        let backend = MemoryBackend::new();
        let first = TestServer::spawn(&backend).await;
        let second = TestServer::spawn(&backend).await;
        let client = reqwest::Client::new();

        let digest = Digest::of(b"nobody has this");
        assert_eq!(
            get_status(&client, &second.url(&format!("/{}", digest))).await,
            404
        );

        first.stop().await;
        second.stop().await;
    }
}
