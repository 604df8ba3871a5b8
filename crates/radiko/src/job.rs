//! Timefree download orchestration.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::auth::manager::Credential;
use crate::error::{RadikoError, ValidationError};
use crate::events::ProgressObserver;
use crate::keepalive::KeepAlive;
use crate::playlist::PlaylistPlanner;
use crate::segment::{SegmentScheduler, assemble};
use crate::sink::FileSink;
use crate::store::SessionStore;
use crate::time::RadikoTime;

/// A download as requested by a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub station: String,
    pub start: String,
    pub end: String,
}

impl DownloadRequest {
    pub fn new(
        station: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            station: station.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn validate(&self) -> Result<DownloadJob, ValidationError> {
        let station = self.station.trim();
        if station.is_empty() {
            return Err(ValidationError::MissingField("station"));
        }
        if self.start.trim().is_empty() {
            return Err(ValidationError::MissingField("start"));
        }
        if self.end.trim().is_empty() {
            return Err(ValidationError::MissingField("end"));
        }
        let start = RadikoTime::parse(self.start.trim())?;
        let end = RadikoTime::parse(self.end.trim())?;
        if start.seconds_until(end) <= 0 {
            return Err(ValidationError::NonPositiveDuration {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(DownloadJob::new(station.to_string(), start, end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Planning,
    FetchingPlaylists,
    FetchingSegments,
    Assembling,
    Done,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed)
    }
}

/// One station/time-range download. Its phase only ever moves forward.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub station: String,
    pub start: RadikoTime,
    pub end: RadikoTime,
    phase: JobPhase,
    history: Vec<JobPhase>,
}

impl DownloadJob {
    fn new(station: String, start: RadikoTime, end: RadikoTime) -> Self {
        Self {
            station,
            start,
            end,
            phase: JobPhase::Planning,
            history: vec![JobPhase::Planning],
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[JobPhase] {
        &self.history
    }

    pub fn duration_secs(&self) -> i64 {
        self.start.seconds_until(self.end)
    }

    /// Moves to `next` when it is ahead of the current phase. Terminal jobs
    /// and backwards moves are ignored.
    fn advance(&mut self, next: JobPhase) -> bool {
        if self.phase.is_terminal() || next <= self.phase {
            return false;
        }
        debug!(station = %self.station, from = ?self.phase, to = ?next, "Job phase");
        self.phase = next;
        self.history.push(next);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub filename: String,
    pub bytes: usize,
    pub segments: usize,
}

/// Drives a [`DownloadJob`] from planning to the saved artifact.
pub struct TimefreeDownloader {
    planner: PlaylistPlanner,
    scheduler: SegmentScheduler,
    sink: Arc<dyn FileSink>,
    store: Arc<dyn SessionStore>,
    keepalive_interval: Duration,
}

impl TimefreeDownloader {
    pub fn new(
        planner: PlaylistPlanner,
        scheduler: SegmentScheduler,
        sink: Arc<dyn FileSink>,
        store: Arc<dyn SessionStore>,
        keepalive_interval: Duration,
    ) -> Self {
        Self {
            planner,
            scheduler,
            sink,
            store,
            keepalive_interval,
        }
    }

    /// Validates `request` and runs it to completion.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        credential: &Credential,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<DownloadOutcome, RadikoError> {
        let mut job = request.validate()?;
        self.run(&mut job, credential, observer).await
    }

    /// Runs a validated job. On error the job ends in [`JobPhase::Failed`].
    pub async fn run(
        &self,
        job: &mut DownloadJob,
        credential: &Credential,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<DownloadOutcome, RadikoError> {
        info!(
            station = %job.station,
            from = %job.start,
            to = %job.end,
            secs = job.duration_secs(),
            "Starting timefree download"
        );

        let keepalive = KeepAlive::start(self.store.clone(), self.keepalive_interval);
        let result = self.run_phases(job, credential, observer).await;
        keepalive.stop().await;

        match &result {
            Ok(outcome) => {
                job.advance(JobPhase::Done);
                info!(path = %outcome.path.display(), bytes = outcome.bytes, "Timefree download finished");
            }
            Err(e) => {
                job.advance(JobPhase::Failed);
                error!(station = %job.station, error = %e, "Timefree download failed");
            }
        }
        result
    }

    async fn run_phases(
        &self,
        job: &mut DownloadJob,
        credential: &Credential,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<DownloadOutcome, RadikoError> {
        job.advance(JobPhase::FetchingPlaylists);
        let segments = self
            .planner
            .plan_segments(&job.station, job.start, job.end, credential, &*observer)
            .await?;
        let segment_count = segments.len();

        job.advance(JobPhase::FetchingSegments);
        let payloads = self
            .scheduler
            .fetch_all(segments, credential, observer)
            .await?;

        job.advance(JobPhase::Assembling);
        let artifact = assemble(&job.station, job.start, payloads);
        let path = self.sink.save(&artifact).await?;

        Ok(DownloadOutcome {
            path,
            filename: artifact.filename,
            bytes: artifact.data.len(),
            segments: segment_count,
        })
    }
}
