//! Broadcast references parsed from radiko.jp page URLs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationError;
use crate::job::DownloadRequest;
use crate::time::RadikoTime;

/// Length assumed for a programme when only its start is known.
pub const DEFAULT_PROGRAM_MINUTES: i64 = 60;

static TIMEFREE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)#!/ts/([A-Z0-9_-]+)/(\d{14})").expect("timefree page regex is valid")
});

static LIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)#!/live/([A-Z0-9_-]+)").expect("live page regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageInfo {
    Timefree { station: String, start: RadikoTime },
    Live { station: String },
}

impl PageInfo {
    pub fn station(&self) -> &str {
        match self {
            PageInfo::Timefree { station, .. } | PageInfo::Live { station } => station,
        }
    }

    /// A download for a timefree page. Without `end`, the programme is
    /// assumed to last [`DEFAULT_PROGRAM_MINUTES`].
    pub fn download_request(&self, end: Option<&str>) -> Result<DownloadRequest, ValidationError> {
        match self {
            PageInfo::Timefree { station, start } => {
                let end = match end {
                    Some(end) => end.to_string(),
                    None => start.add_minutes(DEFAULT_PROGRAM_MINUTES).to_string(),
                };
                Ok(DownloadRequest::new(station.clone(), start.to_string(), end))
            }
            PageInfo::Live { station } => Err(ValidationError::UnrecognizedPage(format!(
                "live page for {station} has no timefree range"
            ))),
        }
    }
}

/// Recognises `#!/ts/<STATION>/<YYYYMMDDHHMMSS>` and `#!/live/<STATION>`.
/// Station ids are upper-cased.
pub fn parse_page_url(url: &str) -> Result<PageInfo, ValidationError> {
    if let Some(caps) = TIMEFREE_REGEX.captures(url) {
        let start = RadikoTime::parse(&caps[2])?;
        return Ok(PageInfo::Timefree {
            station: caps[1].to_ascii_uppercase(),
            start,
        });
    }
    if let Some(caps) = LIVE_REGEX.captures(url) {
        return Ok(PageInfo::Live {
            station: caps[1].to_ascii_uppercase(),
        });
    }
    Err(ValidationError::UnrecognizedPage(url.to_string()))
}
