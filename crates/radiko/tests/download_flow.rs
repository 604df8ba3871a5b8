mod common;

use common::{BROKEN_STATION, EXPIRED_STATION, MockRadiko, VARIANT_STATION, segment_payload};
use radiko_engine::playlist::{HttpManifestSource, PlaylistPlanner};
use radiko_engine::segment::{HttpSegmentFetcher, SegmentScheduler};
use radiko_engine::{
    Credential, CredentialManager, DirectorySink, DownloadRequest, HttpAuthenticator,
    MemorySessionStore, PlaylistError, ProgressEvent, ProgressPhase, RadikoError,
    TimefreeDownloader, create_client,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct Harness {
    mock: MockRadiko,
    downloader: TimefreeDownloader,
    credential: Credential,
    out: TempDir,
}

async fn harness() -> Harness {
    let mock = MockRadiko::start().await;
    let config = mock.config();
    let client = create_client(&config.http).unwrap();
    let store = Arc::new(MemorySessionStore::new());

    let manager = CredentialManager::new(
        store.clone(),
        Arc::new(HttpAuthenticator::new(
            client.clone(),
            config.endpoints.clone(),
            config.auth.clone(),
        )),
        config.auth.clone(),
    );
    let credential = manager.ensure_credential(None).await.unwrap();

    let out = tempfile::tempdir().unwrap();
    let downloader = TimefreeDownloader::new(
        PlaylistPlanner::new(
            Arc::new(HttpManifestSource::new(
                client.clone(),
                config.endpoints.playlist_url.clone(),
                config.download.listing_depth,
            )),
            config.download.chunk_span,
        ),
        SegmentScheduler::new(Arc::new(HttpSegmentFetcher::new(client)), 3),
        Arc::new(DirectorySink::new(out.path())),
        store,
        config.download.keepalive_interval,
    );

    Harness {
        mock,
        downloader,
        credential,
        out,
    }
}

fn expected_body(station: &str, chunk_starts: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    for ft in chunk_starts {
        for i in 0..2 {
            body.extend(segment_payload(&format!("{station}_{ft}_{i}")));
        }
    }
    body
}

#[tokio::test]
async fn test_download_writes_ordered_payloads() {
    let h = harness().await;
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let outcome = h
        .downloader
        .download(
            &DownloadRequest::new("QRR", "20240101120000", "20240101121000"),
            &h.credential,
            Arc::new(move |event: ProgressEvent| sink.lock().unwrap().push(event)),
        )
        .await
        .unwrap();

    assert_eq!(outcome.filename, "RADIKO_QRR_20240101_120000.aac");
    assert_eq!(outcome.segments, 4);
    assert_eq!(outcome.path, h.out.path().join(&outcome.filename));

    let written = std::fs::read(&outcome.path).unwrap();
    assert_eq!(
        written,
        expected_body("QRR", &["20240101120000", "20240101120500"])
    );
    assert_eq!(h.mock.count("/v2/api/ts/playlist.m3u8"), 2);
    assert_eq!(h.mock.count_prefix("/segments/"), 4);

    let events = events.lock().unwrap();
    let playlist: Vec<_> = events
        .iter()
        .filter(|e| e.phase == ProgressPhase::Playlist)
        .map(|e| (e.done, e.total))
        .collect();
    assert_eq!(playlist.first(), Some(&(0, 600)));
    assert!(playlist.contains(&(300, 600)));

    let segments: Vec<_> = events
        .iter()
        .filter(|e| e.phase == ProgressPhase::Segments)
        .map(|e| e.done)
        .collect();
    assert!(segments.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(segments.last(), Some(&4));
}

#[tokio::test]
async fn test_variant_playlist_is_followed() {
    let h = harness().await;

    let outcome = h
        .downloader
        .download(
            &DownloadRequest::new(VARIANT_STATION, "20240101235500", "20240102000000"),
            &h.credential,
            Arc::new(|_: ProgressEvent| {}),
        )
        .await
        .unwrap();

    assert_eq!(outcome.segments, 2);
    assert_eq!(h.mock.count("/v2/api/ts/chunklist.m3u8"), 1);
    assert_eq!(
        std::fs::read(&outcome.path).unwrap(),
        expected_body(VARIANT_STATION, &["20240101235500"])
    );
}

#[tokio::test]
async fn test_expired_archive_is_reported() {
    let h = harness().await;

    let err = h
        .downloader
        .download(
            &DownloadRequest::new(EXPIRED_STATION, "20240101120000", "20240101121000"),
            &h.credential,
            Arc::new(|_: ProgressEvent| {}),
        )
        .await
        .unwrap_err();

    match err {
        RadikoError::Playlist(e) => {
            assert!(e.is_content_unavailable());
            assert!(matches!(e, PlaylistError::ContentUnavailable { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.mock.count_prefix("/segments/"), 0);
    assert_eq!(std::fs::read_dir(h.out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_segment_aborts_without_output() {
    let h = harness().await;

    let err = h
        .downloader
        .download(
            &DownloadRequest::new(BROKEN_STATION, "20240101120000", "20240101121000"),
            &h.credential,
            Arc::new(|_: ProgressEvent| {}),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RadikoError::SegmentFetch(_)));
    assert_eq!(std::fs::read_dir(h.out.path()).unwrap().count(), 0);
}
