use crate::registry::SharedBackend;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Background task that keeps a server lease alive.
///
/// The lease is rewritten every `period` until [`Heartbeat::stop`] is called.
/// `stop` waits for the task to exit, so no refresh can land after it returns.
pub(crate) struct Heartbeat {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    pub(crate) fn spawn(
        backend: SharedBackend,
        lease_key: String,
        hostname: String,
        ttl: Duration,
        period: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let result = {
                            let mut backend = backend.lock().await;
                            backend.set_with_ttl(&lease_key, &hostname, ttl).await
                        };
                        match result {
                            Ok(()) => tracing::trace!("Refreshed lease {}", lease_key),
                            Err(error) => {
                                tracing::warn!("Failed to refresh lease {}: {}", lease_key, error)
                            }
                        }
                    }
                }
            }

            tracing::debug!("Heartbeat for {} stopped", lease_key);
        });

        Self { stop_tx, handle }
    }

    pub(crate) async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(error) = self.handle.await {
            tracing::warn!("Heartbeat task ended abnormally: {}", error);
        }
    }
}
