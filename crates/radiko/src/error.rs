use reqwest::StatusCode;
use std::fmt;

/// Which half of the two-phase handshake failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Auth1,
    Auth2,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPhase::Auth1 => write!(f, "auth1"),
            AuthPhase::Auth2 => write!(f, "auth2"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{phase} failed: HTTP {status}")]
    Status { phase: AuthPhase, status: StatusCode },

    #[error("{phase} request failed: {source}")]
    Network {
        phase: AuthPhase,
        #[source]
        source: reqwest::Error,
    },

    #[error("{phase} response is missing the {header} header")]
    MissingHeader {
        phase: AuthPhase,
        header: &'static str,
    },

    #[error("{phase} response header {header} is malformed: {value:?}")]
    MalformedHeader {
        phase: AuthPhase,
        header: &'static str,
        value: String,
    },

    #[error("partial key range {offset}..{offset}+{length} exceeds the {secret_len}-byte app key")]
    PartialKeyOutOfRange {
        offset: usize,
        length: usize,
        secret_len: usize,
    },

    #[error("auth2 returned no area code")]
    EmptyArea,
}

impl AuthError {
    pub fn phase(&self) -> AuthPhase {
        match self {
            AuthError::Status { phase, .. }
            | AuthError::Network { phase, .. }
            | AuthError::MissingHeader { phase, .. }
            | AuthError::MalformedHeader { phase, .. } => *phase,
            AuthError::PartialKeyOutOfRange { .. } | AuthError::EmptyArea => AuthPhase::Auth2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    /// The service no longer (or never) holds this range, e.g. outside the
    /// retention window.
    #[error("content unavailable: {station} {from}-{to} (HTTP 404)")]
    ContentUnavailable {
        station: String,
        from: String,
        to: String,
    },

    #[error("playlist fetch failed: HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("playlist request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid playlist URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("malformed playlist at {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("nested variant playlist at {url}")]
    NestedVariant { url: String },

    #[error("no segments to download for {station} {from}-{to}")]
    NoSegments {
        station: String,
        from: String,
        to: String,
    },
}

impl PlaylistError {
    pub fn is_content_unavailable(&self) -> bool {
        matches!(self, PlaylistError::ContentUnavailable { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentFetchError {
    #[error("segment fetch failed: HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("segment request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("segment worker aborted: {0}")]
    Worker(String),
}

impl SegmentFetchError {
    pub fn url(&self) -> Option<&str> {
        match self {
            SegmentFetchError::Status { url, .. } | SegmentFetchError::Network { url, .. } => {
                Some(url)
            }
            SegmentFetchError::Worker(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid timestamp {0:?}, expected YYYYMMDDHHMMSS")]
    InvalidTimestamp(String),

    #[error("end time {end} must be after start time {start}")]
    NonPositiveDuration { start: String, end: String },

    #[error("unknown area code {0:?}")]
    UnknownArea(String),

    #[error("unrecognized radiko page URL: {0}")]
    UnrecognizedPage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored value for {key} is corrupt: {reason}")]
    Corrupt { key: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule ceiling exceeded: {requested} rules requested, host allows {ceiling}")]
    CeilingExceeded { requested: usize, ceiling: usize },

    #[error("duplicate rule id {0}")]
    DuplicateId(u32),

    #[error("invalid header {header:?}: {reason}")]
    InvalidHeader { header: String, reason: String },

    #[error("invalid URL filter {filter:?}: {reason}")]
    InvalidPattern { filter: String, reason: String },

    #[error("rule host rejected update: {0}")]
    Host(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to save {filename}: {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Umbrella error for every operation the engine exposes.
#[derive(Debug, thiserror::Error)]
pub enum RadikoError {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    #[error("segment error: {0}")]
    SegmentFetch(#[from] SegmentFetchError),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("a download is already running")]
    Busy,

    #[error("controller is not running")]
    ControllerClosed,
}
