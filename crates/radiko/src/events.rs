use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    /// `done`/`total` are seconds of the requested range covered by fetched playlists
    Playlist,
    /// `done`/`total` are segments
    Segments,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressPhase::Playlist => write!(f, "playlist"),
            ProgressPhase::Segments => write!(f, "segments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub done: u64,
    pub total: u64,
}

impl ProgressEvent {
    pub fn playlist(done: u64, total: u64) -> Self {
        Self {
            phase: ProgressPhase::Playlist,
            done,
            total,
        }
    }

    pub fn segments(done: u64, total: u64) -> Self {
        Self {
            phase: ProgressPhase::Segments,
            done,
            total,
        }
    }
}

/// Receives progress notifications. Delivery is best effort and must never
/// fail the job that reports it.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Fans progress out to any number of listeners.
#[derive(Debug, Clone)]
pub struct BroadcastProgress {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastProgress {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressObserver for BroadcastProgress {
    fn on_progress(&self, event: ProgressEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(phase = %e.0.phase, "No progress listeners");
        }
    }
}
