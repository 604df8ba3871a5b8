use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::OutputManager,
    progress::ProgressReporter,
};
use radiko_engine::page::DEFAULT_PROGRAM_MINUTES;
use radiko_engine::rules::ResourceType;
use radiko_engine::{
    ControlRequest, ControlResponse, Controller, DirectorySink, DownloadRequest,
    HeaderInjectionEngine, JsonFileStore, RadikoTime, control_channel, parse_page_url,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Overrides taken from the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub proxy: Option<String>,
    pub timeout: Option<u64>,
    pub concurrency: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

pub struct CommandExecutor {
    controller: Arc<Controller>,
    engine: Arc<HeaderInjectionEngine>,
    output: OutputManager,
    show_progress: bool,
}

impl CommandExecutor {
    pub async fn new(
        config: &AppConfig,
        overrides: Overrides,
        format: OutputFormat,
        quiet: bool,
    ) -> Result<Self> {
        let engine_config = config.engine_config(
            overrides.proxy.as_deref(),
            overrides.timeout,
            overrides.concurrency,
        );

        let session_path = config.session_path(overrides.config_path.as_deref())?;
        debug!(path = %session_path.display(), "Using session file");
        let store = Arc::new(
            JsonFileStore::open(session_path)
                .await
                .map_err(radiko_engine::RadikoError::from)?,
        );

        let output_dir = overrides
            .output_dir
            .unwrap_or_else(|| config.output_dir.clone());
        let engine = Arc::new(HeaderInjectionEngine::new(engine_config.rules.ceiling));
        let controller = Controller::from_config(
            engine_config,
            store,
            engine.clone(),
            Arc::new(DirectorySink::new(output_dir)),
        )?;

        Ok(Self {
            controller: Arc::new(controller),
            engine,
            output: OutputManager::new(format, config.colored_output),
            show_progress: !quiet && format == OutputFormat::Pretty,
        })
    }

    pub async fn status(&self) -> Result<()> {
        self.controller.restore_rules().await?;
        let report = self.controller.get_status().await?;
        print!("{}", self.output.status(&report)?);
        Ok(())
    }

    pub async fn reauth(&self) -> Result<()> {
        let summary = self.controller.reauthenticate().await?;
        print!("{}", self.output.auth(&summary)?);
        Ok(())
    }

    pub async fn set_area(&self, area_id: &str) -> Result<()> {
        let summary = self.controller.set_area(area_id).await?;
        print!("{}", self.output.auth(&summary)?);
        Ok(())
    }

    pub fn areas(&self) -> Result<()> {
        print!("{}", self.output.areas()?);
        Ok(())
    }

    pub async fn download(
        &self,
        url: Option<String>,
        station: Option<String>,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<()> {
        let request = build_request(url, station, start, end)?;
        info!(
            station = %request.station,
            start = %request.start,
            end = %request.end,
            "Download requested"
        );

        let reporter = ProgressReporter::spawn(
            self.controller.progress().subscribe(),
            &request.station,
            self.show_progress,
        );
        let result = self.controller.download_timefree(&request).await;
        reporter.finish();

        let outcome = result?;
        print!("{}", self.output.download(&outcome)?);
        Ok(())
    }

    pub fn stream_url(&self, station: &str, start: &str, end: &str) -> Result<()> {
        let url = self.controller.stream_url(station, start, end)?;
        println!("{url}");
        Ok(())
    }

    pub async fn rules(&self, match_url: Option<&str>) -> Result<()> {
        self.controller.restore_rules().await?;
        match match_url {
            Some(url) => {
                let headers = self.engine.headers_for(url, ResourceType::XmlHttpRequest);
                print!("{}", self.output.headers(url, &headers)?);
            }
            None => {
                let rules = self.controller.publisher().list_rules().await.map_err(
                    radiko_engine::RadikoError::from,
                )?;
                print!("{}", self.output.rules(&rules)?);
            }
        }
        Ok(())
    }

    /// Initializes, keeps the credential fresh and answers one JSON request
    /// per stdin line until Ctrl-C.
    pub async fn daemon(&self, fresh: bool) -> Result<()> {
        let credential = self.controller.initialize(fresh).await?;
        info!(area = %credential.area_id, token = %credential.token_prefix(), "Daemon ready");

        let period = self.controller.config().auth.reauth_period;
        let alarm = self.controller.spawn_reauth_alarm(period);
        let (handle, rx) = control_channel(16);
        let server = tokio::spawn(self.controller.clone().serve(rx));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("Received Ctrl-C, shutting down");
                    break;
                }
                line = lines.next_line(), if stdin_open => {
                    let Some(line) = line? else {
                        debug!("stdin closed, serving until Ctrl-C");
                        stdin_open = false;
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let handle = handle.clone();
                    tokio::spawn(async move {
                        let response = match serde_json::from_str::<ControlRequest>(&line) {
                            Ok(request) => handle.request(request).await.unwrap_or_else(|e| {
                                ControlResponse::Failure { error: e.to_string() }
                            }),
                            Err(e) => ControlResponse::Failure {
                                error: format!("invalid request: {e}"),
                            },
                        };
                        match serde_json::to_string(&response) {
                            Ok(json) => println!("{json}"),
                            Err(e) => warn!(error = %e, "Failed to encode response"),
                        }
                    });
                }
            }
        }

        alarm.abort();
        drop(handle);
        server.abort();
        Ok(())
    }
}

/// Resolves the download arguments into a request. A page URL wins over
/// `--station`; without `--end` the programme is assumed to last an hour.
pub fn build_request(
    url: Option<String>,
    station: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<DownloadRequest> {
    match (url, station, start) {
        (Some(url), _, _) => Ok(parse_page_url(&url)?.download_request(end.as_deref())?),
        (None, Some(station), Some(start)) => {
            let end = match end {
                Some(end) => end,
                None => RadikoTime::parse(&start)?
                    .add_minutes(DEFAULT_PROGRAM_MINUTES)
                    .to_string(),
            };
            Ok(DownloadRequest::new(station.to_ascii_uppercase(), start, end))
        }
        _ => Err(CliError::InvalidInput(
            "either --url or --station with --start is required".to_string(),
        )),
    }
}
