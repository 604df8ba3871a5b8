use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::manager::now_ms;
use crate::store::{SessionStore, StoreKey};

/// Periodically touches the session store while a download runs.
///
/// Hosts that suspend idle workers treat the write as activity. The touch
/// stops when the guard is stopped or dropped, whichever comes first.
pub struct KeepAlive {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl KeepAlive {
    pub fn start(store: Arc<dyn SessionStore>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(period_secs = period.as_secs(), "Keepalive started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = store.set(vec![(StoreKey::KeepAlive, json!(now_ms()))]).await {
                            warn!(error = %e, "Keepalive touch failed");
                        }
                    }
                }
            }
            debug!("Keepalive stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stops the touch and waits for the task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;

    #[tokio::test(start_paused = true)]
    async fn test_touches_until_stopped() {
        let store = Arc::new(MemorySessionStore::new());
        let keepalive = KeepAlive::start(store.clone(), Duration::from_secs(20));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(store.get(StoreKey::KeepAlive).await.unwrap().is_none());

        tokio::time::sleep(Duration::from_secs(20)).await;
        let first = store.get(StoreKey::KeepAlive).await.unwrap();
        assert!(first.is_some());

        keepalive.stop().await;
        store.remove(&[StoreKey::KeepAlive]).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(store.get(StoreKey::KeepAlive).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_touching() {
        let store = Arc::new(MemorySessionStore::new());
        {
            let _keepalive = KeepAlive::start(store.clone(), Duration::from_secs(20));
            tokio::time::sleep(Duration::from_secs(21)).await;
        }
        assert!(store.get(StoreKey::KeepAlive).await.unwrap().is_some());

        store.remove(&[StoreKey::KeepAlive]).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(store.get(StoreKey::KeepAlive).await.unwrap().is_none());
    }
}
