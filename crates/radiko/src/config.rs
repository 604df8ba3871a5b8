use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Shared secret of the `pc_html5` client. The partial-key proof is a slice of it.
pub const PC_HTML5_APP_KEY: &str = "bcd151073c03b352e1ef2fd66c32209da9ca0afa";

/// URL filters covering the API, stream and CDN hosts a player talks to.
pub const PLAYER_URL_FILTERS: [&str; 4] = [
    "||radiko.jp/v2/api/ts/",
    "||radiko.jp/v3/station/stream/",
    "||smartstream.ne.jp/",
    "||radiko-cf.com/",
];

/// Top-level engine configuration
#[derive(Debug, Clone, Default)]
pub struct RadikoConfig {
    pub endpoints: EndpointConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub download: DownloadConfig,
    pub rules: RuleConfig,
}

impl RadikoConfig {
    pub fn builder() -> crate::builder::RadikoConfigBuilder {
        crate::builder::RadikoConfigBuilder::new()
    }
}

// --- Endpoints ---
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub auth1_url: String,
    pub auth2_url: String,
    /// Timefree playlist endpoint, queried with `station_id`, `l`, `ft` and `to`
    pub playlist_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            auth1_url: "https://radiko.jp/v2/api/auth1".to_string(),
            auth2_url: "https://radiko.jp/v2/api/auth2".to_string(),
            playlist_url: "https://radiko.jp/v2/api/ts/playlist.m3u8".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Points every endpoint at `base`, keeping the service's paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth1_url: format!("{base}/v2/api/auth1"),
            auth2_url: format!("{base}/v2/api/auth2"),
            playlist_url: format!("{base}/v2/api/ts/playlist.m3u8"),
        }
    }
}

// --- HTTP Client ---
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Overall timeout for a single request
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User agent for requests that do not carry the spoofed device agent
    pub user_agent: String,
    /// Explicit proxy URL (http, https or socks5)
    pub proxy: Option<String>,
    /// Whether to fall back to system proxy settings when no proxy is set
    pub use_system_proxy: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            proxy: None,
            use_system_proxy: true,
        }
    }
}

// --- Authentication ---
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Value of `X-Radiko-App`
    pub app_id: String,
    /// Shared secret the partial key is sliced from
    pub app_key: String,
    /// Fixed `(offset, length)` used instead of the values auth1 returns
    pub partial_key_override: Option<(usize, usize)>,
    /// Lifetime of an issued token
    pub token_ttl: Duration,
    /// Period of the forced re-issuance alarm
    pub reauth_period: Duration,
    /// Area used when neither the caller nor the store names one
    pub default_area: String,
    /// Value of `X-Radiko-Connection`
    pub connection: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_id: "pc_html5".to_string(),
            app_key: PC_HTML5_APP_KEY.to_string(),
            partial_key_override: None,
            token_ttl: Duration::from_secs(70 * 60),
            reauth_period: Duration::from_secs(65 * 60),
            default_area: crate::auth::area::FALLBACK_AREA.to_string(),
            connection: "wifi".to_string(),
        }
    }
}

// --- Download ---
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum span covered by one playlist request
    pub chunk_span: Duration,
    /// Value of the `l` query parameter
    pub listing_depth: u32,
    /// Number of segment workers
    pub concurrency: usize,
    /// Period of the store touch while a fetch runs
    pub keepalive_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_span: Duration::from_secs(300),
            listing_depth: 15,
            concurrency: 4,
            keepalive_interval: Duration::from_secs(20),
        }
    }
}

// --- Injection Rules ---
#[derive(Debug, Clone)]
pub struct RuleConfig {
    /// Maximum number of rules the host accepts
    pub ceiling: usize,
    /// URL filters that receive the player rule
    pub player_url_filters: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            ceiling: 100,
            player_url_filters: PLAYER_URL_FILTERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
