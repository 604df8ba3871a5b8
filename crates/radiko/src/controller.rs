//! Background controller.
//!
//! Owns every component, keeps the credential and rule set in step, and
//! answers request/response messages from a foreground client.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::area::is_known_area;
use crate::auth::handshake::{Authenticator, HttpAuthenticator};
use crate::auth::manager::{Credential, CredentialManager, now_ms, token_prefix};
use crate::client::create_client;
use crate::config::RadikoConfig;
use crate::error::{RadikoError, ValidationError};
use crate::events::BroadcastProgress;
use crate::job::{DownloadOutcome, DownloadRequest, TimefreeDownloader};
use crate::playlist::{HttpManifestSource, ManifestSource, PlaylistPlanner, timefree_playlist_url};
use crate::rules::{InjectionRule, RuleEngine, RulePublisher};
use crate::segment::{HttpSegmentFetcher, SegmentDownloader, SegmentScheduler};
use crate::sink::FileSink;
use crate::store::{SessionStore, StoreKey};
use crate::time::RadikoTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub token_present: bool,
    pub token_prefix: Option<String>,
    pub area_id: Option<String>,
    pub area_info: Option<String>,
    pub token_age_ms: Option<u64>,
    pub rule_count: usize,
    pub rules: Vec<InjectionRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSummary {
    pub area_id: String,
    pub area_info: String,
    pub token_prefix: String,
}

impl From<&Credential> for AuthSummary {
    fn from(credential: &Credential) -> Self {
        Self {
            area_id: credential.area_id.clone(),
            area_info: credential.area_info.clone(),
            token_prefix: credential.token_prefix().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlRequest {
    GetStatus,
    Reauth,
    SetArea {
        area_id: String,
    },
    DownloadTimefree {
        station_id: String,
        start_time: String,
        end_time: String,
    },
    GetStreamUrl {
        station_id: String,
        start_time: String,
        end_time: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlResponse {
    Status(StatusReport),
    Auth(AuthSummary),
    Download { success: bool, path: PathBuf },
    StreamUrl { stream_url: String },
    Failure { error: String },
}

type Envelope = (ControlRequest, oneshot::Sender<ControlResponse>);

/// Creates a connected client handle and request receiver.
pub fn control_channel(buffer: usize) -> (ControllerHandle, mpsc::Receiver<Envelope>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ControllerHandle { tx }, rx)
}

/// Client side of [`Controller::serve`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ControllerHandle {
    pub async fn request(&self, request: ControlRequest) -> Result<ControlResponse, RadikoError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| RadikoError::ControllerClosed)?;
        reply_rx.await.map_err(|_| RadikoError::ControllerClosed)
    }

    pub async fn status(&self) -> Result<ControlResponse, RadikoError> {
        self.request(ControlRequest::GetStatus).await
    }

    pub async fn reauth(&self) -> Result<ControlResponse, RadikoError> {
        self.request(ControlRequest::Reauth).await
    }

    pub async fn set_area(&self, area_id: impl Into<String>) -> Result<ControlResponse, RadikoError> {
        self.request(ControlRequest::SetArea {
            area_id: area_id.into(),
        })
        .await
    }

    pub async fn download(&self, request: DownloadRequest) -> Result<ControlResponse, RadikoError> {
        self.request(ControlRequest::DownloadTimefree {
            station_id: request.station,
            start_time: request.start,
            end_time: request.end,
        })
        .await
    }
}

pub struct Controller {
    config: RadikoConfig,
    store: Arc<dyn SessionStore>,
    credentials: CredentialManager,
    publisher: RulePublisher,
    downloader: TimefreeDownloader,
    progress: BroadcastProgress,
    active_job: Mutex<()>,
    /// Held from credential lookup until its rules are published
    rule_sync: Mutex<()>,
}

impl Controller {
    pub fn new(
        config: RadikoConfig,
        store: Arc<dyn SessionStore>,
        authenticator: Arc<dyn Authenticator>,
        rule_engine: Arc<dyn RuleEngine>,
        manifest_source: Arc<dyn ManifestSource>,
        segment_downloader: Arc<dyn SegmentDownloader>,
        sink: Arc<dyn FileSink>,
    ) -> Self {
        let credentials = CredentialManager::new(store.clone(), authenticator, config.auth.clone());
        let publisher = RulePublisher::new(
            rule_engine,
            config.rules.clone(),
            config.endpoints.clone(),
        );
        let downloader = TimefreeDownloader::new(
            PlaylistPlanner::new(manifest_source, config.download.chunk_span),
            SegmentScheduler::new(segment_downloader, config.download.concurrency),
            sink,
            store.clone(),
            config.download.keepalive_interval,
        );

        Self {
            config,
            store,
            credentials,
            publisher,
            downloader,
            progress: BroadcastProgress::default(),
            active_job: Mutex::new(()),
            rule_sync: Mutex::new(()),
        }
    }

    /// Wires the HTTP implementations of every network component.
    pub fn from_config(
        config: RadikoConfig,
        store: Arc<dyn SessionStore>,
        rule_engine: Arc<dyn RuleEngine>,
        sink: Arc<dyn FileSink>,
    ) -> Result<Self, RadikoError> {
        let client = create_client(&config.http)?;
        let authenticator = Arc::new(HttpAuthenticator::new(
            client.clone(),
            config.endpoints.clone(),
            config.auth.clone(),
        ));
        let manifest_source = Arc::new(HttpManifestSource::new(
            client.clone(),
            config.endpoints.playlist_url.clone(),
            config.download.listing_depth,
        ));
        let segment_downloader = Arc::new(HttpSegmentFetcher::new(client));

        Ok(Self::new(
            config,
            store,
            authenticator,
            rule_engine,
            manifest_source,
            segment_downloader,
            sink,
        ))
    }

    pub fn config(&self) -> &RadikoConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn publisher(&self) -> &RulePublisher {
        &self.publisher
    }

    pub fn progress(&self) -> &BroadcastProgress {
        &self.progress
    }

    /// Ensures a credential (or forces a new one) and republishes the rules
    /// that depend on it.
    pub async fn initialize(&self, force: bool) -> Result<Credential, RadikoError> {
        let _sync = self.rule_sync.lock().await;
        let credential = if force {
            self.credentials.force_reauthenticate(None).await?
        } else {
            self.credentials.ensure_credential(None).await?
        };

        if let Some(device) = self.credentials.stored_device().await? {
            self.publisher.publish_auth_rules(&device).await?;
        }
        self.publisher.publish_player_rules(&credential).await?;

        info!(area = %credential.area_id, forced = force, "Controller initialized");
        Ok(credential)
    }

    /// Republishes rules for a still-fresh cached credential without any
    /// network call. Returns whether rules were published.
    pub async fn restore_rules(&self) -> Result<bool, RadikoError> {
        let _sync = self.rule_sync.lock().await;
        let Some(credential) = self.credentials.cached_credential().await? else {
            return Ok(false);
        };
        if !credential.is_fresh(now_ms(), self.config.auth.token_ttl) {
            debug!("Cached token expired, rules not restored");
            return Ok(false);
        }
        if let Some(device) = self.credentials.stored_device().await? {
            self.publisher.publish_auth_rules(&device).await?;
        }
        self.publisher.publish_player_rules(&credential).await?;
        Ok(true)
    }

    pub async fn get_status(&self) -> Result<StatusReport, RadikoError> {
        let token = self.store.get_string(StoreKey::AuthToken).await?;
        let issued_at = self.store.get_i64(StoreKey::TokenTimestamp).await?;
        let rules = self.publisher.list_rules().await?;

        Ok(StatusReport {
            token_present: token.is_some(),
            token_prefix: token.as_deref().map(|t| token_prefix(t).to_string()),
            area_id: self.store.get_string(StoreKey::AreaId).await?,
            area_info: self.store.get_string(StoreKey::AreaInfo).await?,
            token_age_ms: issued_at.map(|t| now_ms().saturating_sub(t).max(0) as u64),
            rule_count: rules.len(),
            rules,
        })
    }

    pub async fn reauthenticate(&self) -> Result<AuthSummary, RadikoError> {
        let credential = self.initialize(true).await?;
        Ok(AuthSummary::from(&credential))
    }

    /// Stores a new preferred area and re-issues the credential for it.
    pub async fn set_area(&self, area_id: &str) -> Result<AuthSummary, RadikoError> {
        let area_id = area_id.trim().to_ascii_uppercase();
        if !is_known_area(&area_id) {
            return Err(ValidationError::UnknownArea(area_id).into());
        }
        self.store
            .set(vec![(StoreKey::PreferredArea, json!(area_id))])
            .await?;
        self.reauthenticate().await
    }

    /// Runs one download. Only one download runs at a time per controller.
    pub async fn download_timefree(
        &self,
        request: &DownloadRequest,
    ) -> Result<DownloadOutcome, RadikoError> {
        let mut job = request.validate()?;
        let _active = self.active_job.try_lock().map_err(|_| RadikoError::Busy)?;

        let credential = self.initialize(false).await?;
        self.downloader
            .run(&mut job, &credential, Arc::new(self.progress.clone()))
            .await
    }

    /// Playlist URL for a range, for debugging in an external player.
    pub fn stream_url(&self, station: &str, start: &str, end: &str) -> Result<String, RadikoError> {
        let station = station.trim();
        if station.is_empty() {
            return Err(ValidationError::MissingField("station").into());
        }
        let url = timefree_playlist_url(
            &self.config.endpoints.playlist_url,
            self.config.download.listing_depth,
            station,
            RadikoTime::parse(start)?,
            RadikoTime::parse(end)?,
        )?;
        Ok(url.into())
    }

    /// Forces a re-issuance every `period`. The first tick is skipped and
    /// failures are logged without stopping the alarm.
    pub fn spawn_reauth_alarm(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Scheduled reauthentication");
                if let Err(e) = this.initialize(true).await {
                    warn!(error = %e, "Scheduled reauthentication failed");
                }
            }
        })
    }

    /// Answers requests until every [`ControllerHandle`] is dropped. Each
    /// request runs on its own task so status queries stay responsive during
    /// a download.
    pub async fn serve(self: Arc<Self>, mut requests: mpsc::Receiver<Envelope>) {
        while let Some((request, reply)) = requests.recv().await {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                let response = this.handle(request).await;
                if reply.send(response).is_err() {
                    debug!("Requester went away before the reply");
                }
            });
        }
        debug!("Control channel closed");
    }

    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        let result = match request {
            ControlRequest::GetStatus => self.get_status().await.map(ControlResponse::Status),
            ControlRequest::Reauth => self.reauthenticate().await.map(ControlResponse::Auth),
            ControlRequest::SetArea { area_id } => {
                self.set_area(&area_id).await.map(ControlResponse::Auth)
            }
            ControlRequest::DownloadTimefree {
                station_id,
                start_time,
                end_time,
            } => self
                .download_timefree(&DownloadRequest::new(station_id, start_time, end_time))
                .await
                .map(|outcome| ControlResponse::Download {
                    success: true,
                    path: outcome.path,
                }),
            ControlRequest::GetStreamUrl {
                station_id,
                start_time,
                end_time,
            } => self
                .stream_url(&station_id, &start_time, &end_time)
                .map(|stream_url| ControlResponse::StreamUrl { stream_url }),
        };

        result.unwrap_or_else(|e| {
            warn!(error = %e, "Control request failed");
            ControlResponse::Failure {
                error: e.to_string(),
            }
        })
    }
}
