use indicatif::ProgressStyle;
use radiko_engine::{ProgressEvent, ProgressPhase};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

fn playlist_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.cyan/white}] {pos}/{len}s",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

fn segment_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} segments ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

fn phase_message(phase: ProgressPhase, station: &str) -> String {
    match phase {
        ProgressPhase::Playlist => format!("{station}: fetching playlists"),
        ProgressPhase::Segments => format!("{station}: downloading segments"),
    }
}

/// Draws download progress as a tracing-indicatif span bar.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn spawn(mut events: broadcast::Receiver<ProgressEvent>, station: &str, enabled: bool) -> Self {
        if !enabled {
            return Self { handle: None };
        }

        let station = station.to_string();
        let span = info_span!("download", station = %station);
        let handle = tokio::spawn(
            async move {
                let mut current: Option<ProgressPhase> = None;
                loop {
                    let event = match events.recv().await {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Progress bar fell behind");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let span = Span::current();
                    if current != Some(event.phase) {
                        current = Some(event.phase);
                        let style = match event.phase {
                            ProgressPhase::Playlist => playlist_style(),
                            ProgressPhase::Segments => segment_style(),
                        };
                        span.pb_set_style(&style);
                        span.pb_set_message(&phase_message(event.phase, &station));
                    }
                    span.pb_set_length(event.total);
                    span.pb_set_position(event.done);
                }
            }
            .instrument(span),
        );

        Self {
            handle: Some(handle),
        }
    }

    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_message() {
        assert_eq!(
            phase_message(ProgressPhase::Playlist, "TBS"),
            "TBS: fetching playlists"
        );
        assert_eq!(
            phase_message(ProgressPhase::Segments, "TBS"),
            "TBS: downloading segments"
        );
    }

    #[tokio::test]
    async fn test_disabled_reporter_spawns_nothing() {
        let (tx, rx) = broadcast::channel(4);
        let reporter = ProgressReporter::spawn(rx, "TBS", false);
        assert!(reporter.handle.is_none());
        drop(tx);
        reporter.finish();
    }
}
