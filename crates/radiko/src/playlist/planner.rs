use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::chunk::{Chunk, plan_chunks};
use super::manifest::{Manifest, parse_manifest, resolve_entry};
use crate::auth::handshake::{HEADER_AREA_ID, HEADER_AUTH_TOKEN};
use crate::auth::manager::Credential;
use crate::error::PlaylistError;
use crate::events::{ProgressEvent, ProgressObserver};
use crate::time::RadikoTime;

/// A segment URL and its position in the final output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRef {
    pub ordinal: usize,
    pub url: String,
}

/// Supplies the segment URLs of one chunk, in manifest order.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_chunk(
        &self,
        station: &str,
        chunk: &Chunk,
        credential: &Credential,
    ) -> Result<Vec<String>, PlaylistError>;
}

/// Builds the timefree playlist URL for a station and window.
pub fn timefree_playlist_url(
    endpoint: &str,
    listing_depth: u32,
    station: &str,
    from: RadikoTime,
    to: RadikoTime,
) -> Result<Url, PlaylistError> {
    let mut url = Url::parse(endpoint).map_err(|e| PlaylistError::InvalidUrl {
        url: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("station_id", station)
        .append_pair("l", &listing_depth.to_string())
        .append_pair("ft", &from.to_string())
        .append_pair("to", &to.to_string());
    Ok(url)
}

/// Fetches timefree playlists over HTTP with the credential headers attached.
#[derive(Debug, Clone)]
pub struct HttpManifestSource {
    client: Client,
    playlist_url: String,
    listing_depth: u32,
}

impl HttpManifestSource {
    pub fn new(client: Client, playlist_url: impl Into<String>, listing_depth: u32) -> Self {
        Self {
            client,
            playlist_url: playlist_url.into(),
            listing_depth,
        }
    }

    async fn get_manifest(
        &self,
        url: &Url,
        station: &str,
        chunk: &Chunk,
        credential: &Credential,
    ) -> Result<Manifest, PlaylistError> {
        let network = |source| PlaylistError::Network {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            .header(HEADER_AUTH_TOKEN, &credential.token)
            .header(HEADER_AREA_ID, &credential.area_id)
            .send()
            .await
            .map_err(network)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(PlaylistError::ContentUnavailable {
                station: station.to_string(),
                from: chunk.from.to_string(),
                to: chunk.to.to_string(),
            }),
            status if !status.is_success() => Err(PlaylistError::Status {
                url: url.to_string(),
                status,
            }),
            _ => {
                let body = response.bytes().await.map_err(network)?;
                parse_manifest(&body).map_err(|reason| PlaylistError::Malformed {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch_chunk(
        &self,
        station: &str,
        chunk: &Chunk,
        credential: &Credential,
    ) -> Result<Vec<String>, PlaylistError> {
        let mut url = timefree_playlist_url(
            &self.playlist_url,
            self.listing_depth,
            station,
            chunk.from,
            chunk.to,
        )?;
        let mut manifest = self.get_manifest(&url, station, chunk, credential).await?;

        if let Manifest::Variant(variants) = manifest {
            let Some(first) = variants.into_iter().next() else {
                return Ok(Vec::new());
            };
            url = resolve_entry(&url, &first).map_err(|e| PlaylistError::InvalidUrl {
                url: first.clone(),
                reason: e.to_string(),
            })?;
            debug!(media_playlist = %url, "Following variant playlist");
            manifest = self.get_manifest(&url, station, chunk, credential).await?;
        }

        let Manifest::Media(entries) = manifest else {
            return Err(PlaylistError::NestedVariant {
                url: url.to_string(),
            });
        };
        entries
            .into_iter()
            .map(|entry| {
                resolve_entry(&url, &entry)
                    .map(String::from)
                    .map_err(|e| PlaylistError::InvalidUrl {
                        url: entry,
                        reason: e.to_string(),
                    })
            })
            .collect()
    }
}

/// Produces the ordered segment list of a job.
pub struct PlaylistPlanner {
    source: Arc<dyn ManifestSource>,
    chunk_span: Duration,
}

impl PlaylistPlanner {
    pub fn new(source: Arc<dyn ManifestSource>, chunk_span: Duration) -> Self {
        Self { source, chunk_span }
    }

    /// Fetches every chunk's manifest in temporal order and numbers the
    /// segments in that order.
    ///
    /// Any failed chunk fails the plan without requesting later chunks.
    pub async fn plan_segments(
        &self,
        station: &str,
        start: RadikoTime,
        end: RadikoTime,
        credential: &Credential,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<SegmentRef>, PlaylistError> {
        let total_secs = start.seconds_until(end).max(0) as u64;
        let chunks = plan_chunks(start, end, self.chunk_span);
        info!(
            station = %station,
            from = %start,
            to = %end,
            chunks = chunks.len(),
            "Planning segments"
        );

        let mut segments = Vec::new();
        for chunk in &chunks {
            observer.on_progress(ProgressEvent::playlist(chunk.elapsed_secs as u64, total_secs));

            let urls = match self.source.fetch_chunk(station, chunk, credential).await {
                Ok(urls) => urls,
                Err(e) => {
                    warn!(station = %station, from = %chunk.from, to = %chunk.to, error = %e, "Playlist fetch failed");
                    return Err(e);
                }
            };
            debug!(from = %chunk.from, to = %chunk.to, count = urls.len(), "Fetched chunk playlist");

            let base = segments.len();
            segments.extend(
                urls.into_iter()
                    .enumerate()
                    .map(|(i, url)| SegmentRef { ordinal: base + i, url }),
            );
        }

        if segments.is_empty() {
            return Err(PlaylistError::NoSegments {
                station: station.to_string(),
                from: start.to_string(),
                to: end.to_string(),
            });
        }

        info!(station = %station, segments = segments.len(), "Segment plan ready");
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopProgress;
    use parking_lot::Mutex;

    fn t(s: &str) -> RadikoTime {
        RadikoTime::parse(s).unwrap()
    }

    fn credential() -> Credential {
        Credential {
            token: "tok".into(),
            area_id: "JP13".into(),
            area_info: String::new(),
            issued_at_ms: 0,
        }
    }

    /// Serves canned chunk results in order, recording each window asked for.
    struct ScriptedSource {
        responses: Mutex<Vec<Result<Vec<String>, PlaylistError>>>,
        windows: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<String>, PlaylistError>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                windows: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ManifestSource for ScriptedSource {
        async fn fetch_chunk(
            &self,
            _station: &str,
            chunk: &Chunk,
            _credential: &Credential,
        ) -> Result<Vec<String>, PlaylistError> {
            self.windows
                .lock()
                .push((chunk.from.to_string(), chunk.to.to_string()));
            self.responses.lock().pop().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("https://x/{n}")).collect()
    }

    #[test]
    fn test_playlist_url() {
        let url = timefree_playlist_url(
            "https://radiko.jp/v2/api/ts/playlist.m3u8",
            15,
            "TBS",
            t("20240101120000"),
            t("20240101120500"),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://radiko.jp/v2/api/ts/playlist.m3u8?station_id=TBS&l=15&ft=20240101120000&to=20240101120500"
        );
    }

    #[tokio::test]
    async fn test_ordinals_follow_chunk_then_manifest_order() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(urls(&["a", "b"])),
            Ok(urls(&["c"])),
        ]));
        let planner = PlaylistPlanner::new(source.clone(), Duration::from_secs(300));
        let plan = planner
            .plan_segments("TBS", t("20240101120000"), t("20240101121000"), &credential(), &NoopProgress)
            .await
            .unwrap();

        assert_eq!(
            plan,
            vec![
                SegmentRef { ordinal: 0, url: "https://x/a".into() },
                SegmentRef { ordinal: 1, url: "https://x/b".into() },
                SegmentRef { ordinal: 2, url: "https://x/c".into() },
            ]
        );
        assert_eq!(
            *source.windows.lock(),
            vec![
                ("20240101120000".to_string(), "20240101120500".to_string()),
                ("20240101120500".to_string(), "20240101121000".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_not_found_stops_remaining_chunks() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(urls(&["a"])),
            Err(PlaylistError::ContentUnavailable {
                station: "TBS".into(),
                from: "20240101120500".into(),
                to: "20240101121000".into(),
            }),
            Ok(urls(&["never"])),
        ]));
        let planner = PlaylistPlanner::new(source.clone(), Duration::from_secs(300));
        let err = planner
            .plan_segments("TBS", t("20240101120000"), t("20240101121500"), &credential(), &NoopProgress)
            .await
            .unwrap_err();

        assert!(err.is_content_unavailable());
        assert_eq!(source.windows.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_plan_is_distinct_error() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![]), Ok(vec![])]));
        let planner = PlaylistPlanner::new(source, Duration::from_secs(300));
        let err = planner
            .plan_segments("TBS", t("20240101120000"), t("20240101121000"), &credential(), &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, PlaylistError::NoSegments { .. }));
        assert!(!err.is_content_unavailable());
    }

    #[tokio::test]
    async fn test_playlist_progress_reports_elapsed_seconds() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(urls(&["a"])), Ok(urls(&["b"]))]));
        let planner = PlaylistPlanner::new(source, Duration::from_secs(300));
        let seen = Mutex::new(Vec::new());
        let observer = |e: ProgressEvent| seen.lock().push((e.done, e.total));
        planner
            .plan_segments("TBS", t("20240101120000"), t("20240101120730"), &credential(), &observer)
            .await
            .unwrap();
        assert_eq!(*seen.lock(), vec![(0, 450), (300, 450)]);
    }
}
