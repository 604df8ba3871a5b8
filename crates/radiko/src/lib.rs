//! # Radiko Engine
//!
//! Acquisition engine for radiko.jp timefree programmes.
//!
//! ## Features
//!
//! - Two-phase device authentication with token caching per area
//! - Header injection rules kept in step with the active credential
//! - Chunked playlist planning and bounded-concurrency segment fetching
//! - ID3-stripped AAC assembly written through a pluggable sink
//! - A request/response controller for foreground clients

pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod job;
pub mod keepalive;
pub mod page;
pub mod playlist;
pub mod rules;
pub mod segment;
pub mod sink;
pub mod store;
pub mod time;

pub use builder::RadikoConfigBuilder;
pub use client::create_client;
pub use config::{AuthConfig, DownloadConfig, EndpointConfig, HttpConfig, RadikoConfig, RuleConfig};
pub use error::{
    AuthError, PlaylistError, RadikoError, RuleError, SegmentFetchError, SinkError, StoreError,
    ValidationError,
};

// Re-export the pieces a client wires together
pub use auth::{Credential, CredentialManager, DeviceIdentity, HttpAuthenticator};
pub use controller::{
    AuthSummary, ControlRequest, ControlResponse, Controller, ControllerHandle, StatusReport,
    control_channel,
};
pub use events::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressObserver, ProgressPhase};
pub use job::{DownloadJob, DownloadOutcome, DownloadRequest, JobPhase, TimefreeDownloader};
pub use page::{PageInfo, parse_page_url};
pub use rules::{HeaderInjectionEngine, InjectionRule, RuleEngine, RulePublisher};
pub use sink::{DirectorySink, FileSink};
pub use store::{JsonFileStore, MemorySessionStore, SessionStore, StoreKey};
pub use time::RadikoTime;
