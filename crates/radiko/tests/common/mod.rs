//! In-process stand-in for the radiko.jp auth and timefree endpoints.

#![allow(dead_code)]

use axum::Router;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use radiko_engine::auth::AREAS;
use radiko_engine::{RadikoConfig, RadikoTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Station whose archive has expired; its playlists answer 404.
pub const EXPIRED_STATION: &str = "EXPIRED";
/// Station served through a variant playlist.
pub const VARIANT_STATION: &str = "TBS";
/// Station whose second segment of every chunk answers 500.
pub const BROKEN_STATION: &str = "BROKEN";

/// Partial key the mock expects for offset 8, length 8.
pub const EXPECTED_PARTIAL_KEY: &str = "M2MwM2IzNTI=";

#[derive(Default)]
pub struct MockState {
    counts: Mutex<HashMap<String, usize>>,
    tokens_issued: Mutex<usize>,
    locations: Mutex<Vec<String>>,
}

pub struct MockRadiko {
    base_url: String,
    state: Arc<MockState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockRadiko {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState::default());

        let counter = state.clone();
        let app = Router::new()
            .route("/v2/api/auth1", get(auth1))
            .route("/v2/api/auth2", get(auth2))
            .route("/v2/api/ts/playlist.m3u8", get(playlist))
            .route("/v2/api/ts/chunklist.m3u8", get(chunklist))
            .route("/segments/{name}", get(segment))
            .layer(axum::middleware::from_fn(
                move |req: Request, next: Next| {
                    let state = counter.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        *state.counts.lock().unwrap().entry(path).or_insert(0) += 1;
                        next.run(req).await
                    }
                },
            ))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Engine configuration pointed at this server.
    pub fn config(&self) -> RadikoConfig {
        RadikoConfig::builder()
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(5))
            .with_system_proxy(false)
            .with_keepalive_interval(Duration::from_secs(20))
            .build()
    }

    pub fn count(&self, path: &str) -> usize {
        self.state
            .counts
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.state
            .counts
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }

    pub fn tokens_issued(&self) -> usize {
        *self.state.tokens_issued.lock().unwrap()
    }

    /// `X-Radiko-Location` values seen by auth2, in order.
    pub fn locations(&self) -> Vec<String> {
        self.state.locations.lock().unwrap().clone()
    }
}

impl Drop for MockRadiko {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Bytes a segment decodes to once its ID3 block is stripped.
pub fn segment_payload(name: &str) -> Vec<u8> {
    format!("<{name}>").into_bytes()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_valid_token(headers: &HeaderMap) -> bool {
    header(headers, "X-Radiko-AuthToken").is_some_and(|t| t.starts_with("mock-token-"))
}

async fn auth1(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if header(&headers, "X-Radiko-App") != Some("pc_html5")
        || header(&headers, "X-Radiko-User").is_none()
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let token = {
        let mut issued = state.tokens_issued.lock().unwrap();
        *issued += 1;
        format!("mock-token-{}", *issued)
    };
    (
        [
            ("X-Radiko-AuthToken", token),
            ("X-Radiko-KeyOffset", "8".to_string()),
            ("X-Radiko-KeyLength", "8".to_string()),
        ],
        "OK",
    )
        .into_response()
}

async fn auth2(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !is_valid_token(&headers) || header(&headers, "X-Radiko-PartialKey") != Some(EXPECTED_PARTIAL_KEY)
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let location = header(&headers, "X-Radiko-Location").unwrap_or_default().to_string();
    state.locations.lock().unwrap().push(location.clone());

    let area = AREAS
        .iter()
        .find(|area| area.location_header() == location)
        .unwrap_or(&AREAS[12]);
    format!("{},{},mock Japan\r\n", area.id, area.name).into_response()
}

fn media_playlist(station: &str, ft: &str) -> String {
    let mut body = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:5\n");
    for i in 0..2 {
        body.push_str("#EXTINF:5.0,\n");
        body.push_str(&format!("/segments/{station}_{ft}_{i}.aac\n"));
    }
    body.push_str("#EXT-X-ENDLIST\n");
    body
}

async fn playlist(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !is_valid_token(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let (Some(station), Some(ft), Some(to)) =
        (query.get("station_id"), query.get("ft"), query.get("to"))
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if RadikoTime::parse(ft).is_err() || RadikoTime::parse(to).is_err() || query.get("l").is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match station.as_str() {
        EXPIRED_STATION => StatusCode::NOT_FOUND.into_response(),
        VARIANT_STATION => format!(
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=52973,CODECS=\"mp4a.40.5\"\nchunklist.m3u8?station={station}&ft={ft}\n"
        )
        .into_response(),
        _ => media_playlist(station, ft).into_response(),
    }
}

async fn chunklist(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Response {
    if !is_valid_token(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match (query.get("station"), query.get("ft")) {
        (Some(station), Some(ft)) => media_playlist(station, ft).into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn segment(headers: HeaderMap, Path(name): Path<String>) -> Response {
    if !is_valid_token(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let stem = name.trim_end_matches(".aac");
    if stem.starts_with(BROKEN_STATION) && stem.ends_with("_1") {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    // ID3v2.4 block with a 4-byte body ahead of the payload
    let mut body = vec![b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0];
    body.extend_from_slice(&segment_payload(stem));
    body.into_response()
}
