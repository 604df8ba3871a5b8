// Segment scheduler: a fixed pool of workers pulling segment positions from a
// shared atomic dispenser and writing each payload into its own slot.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::fetcher::SegmentDownloader;
use crate::auth::manager::Credential;
use crate::error::SegmentFetchError;
use crate::events::{ProgressEvent, ProgressObserver};
use crate::playlist::SegmentRef;

struct SharedState {
    segments: Vec<SegmentRef>,
    next: AtomicUsize,
    /// One slot per ordinal, written at most once
    slots: Vec<OnceLock<Bytes>>,
    /// Completed count; progress is emitted while holding it so `done` never goes backwards
    done: Mutex<u64>,
    cancel: CancellationToken,
}

pub struct SegmentScheduler {
    fetcher: Arc<dyn SegmentDownloader>,
    concurrency: usize,
}

impl SegmentScheduler {
    pub fn new(fetcher: Arc<dyn SegmentDownloader>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Downloads every segment and strips its ID3 framing.
    ///
    /// Payloads are returned in ordinal order whatever order they complete in.
    /// The first failure cancels every outstanding fetch and is returned; no
    /// partial result is kept.
    pub async fn fetch_all(
        &self,
        segments: Vec<SegmentRef>,
        credential: &Credential,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<Vec<Bytes>, SegmentFetchError> {
        let total = segments.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let state = Arc::new(SharedState {
            slots: (0..total).map(|_| OnceLock::new()).collect(),
            segments,
            next: AtomicUsize::new(0),
            done: Mutex::new(0),
            cancel: CancellationToken::new(),
        });
        let credential = Arc::new(credential.clone());

        let workers_count = self.concurrency.min(total);
        info!(segments = total, workers = workers_count, "Fetching segments");

        let mut workers = JoinSet::new();
        for worker_id in 0..workers_count {
            workers.spawn(Self::worker(
                worker_id,
                state.clone(),
                self.fetcher.clone(),
                credential.clone(),
                observer.clone(),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            let failure = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => SegmentFetchError::Worker(e.to_string()),
            };
            state.cancel.cancel();
            workers.abort_all();
            return Err(failure);
        }

        let state = Arc::try_unwrap(state)
            .map_err(|_| SegmentFetchError::Worker("segment workers still running".to_string()))?;
        state
            .slots
            .into_iter()
            .enumerate()
            .map(|(ordinal, slot)| {
                slot.into_inner().ok_or_else(|| {
                    SegmentFetchError::Worker(format!("segment {ordinal} was never fetched"))
                })
            })
            .collect()
    }

    async fn worker(
        worker_id: usize,
        state: Arc<SharedState>,
        fetcher: Arc<dyn SegmentDownloader>,
        credential: Arc<Credential>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), SegmentFetchError> {
        let total = state.segments.len() as u64;
        loop {
            if state.cancel.is_cancelled() {
                return Ok(());
            }
            let index = state.next.fetch_add(1, Ordering::Relaxed);
            let Some(segment) = state.segments.get(index) else {
                debug!(worker_id, "Segment queue drained");
                return Ok(());
            };

            let raw = tokio::select! {
                _ = state.cancel.cancelled() => return Ok(()),
                result = fetcher.download_segment(segment, &credential) => match result {
                    Ok(raw) => raw,
                    Err(e) => {
                        error!(url = %segment.url, ordinal = segment.ordinal, error = %e, "Segment download failed");
                        state.cancel.cancel();
                        return Err(e);
                    }
                },
            };

            let payload = aac::strip_id3(raw);
            if state.slots[index].set(payload).is_err() {
                state.cancel.cancel();
                return Err(SegmentFetchError::Worker(format!(
                    "segment {index} was fetched twice"
                )));
            }

            {
                let mut done = state.done.lock();
                // no progress once any worker has failed
                if state.cancel.is_cancelled() {
                    return Ok(());
                }
                *done += 1;
                observer.on_progress(ProgressEvent::segments(*done, total));
            }
        }
    }
}
