//! # Builder for RadikoConfig
//!
//! Fluent construction of a [`RadikoConfig`] on top of its defaults.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use radiko_engine::RadikoConfig;
//!
//! let config = RadikoConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_concurrency(8)
//!     .with_default_area("JP27")
//!     .with_proxy("socks5://127.0.0.1:1080")
//!     .build();
//!
//! assert_eq!(config.download.concurrency, 8);
//! assert_eq!(config.auth.default_area, "JP27");
//! ```

use std::time::Duration;

use crate::config::{EndpointConfig, RadikoConfig};

/// Builder for creating RadikoConfig instances with a fluent API
#[derive(Debug, Clone, Default)]
pub struct RadikoConfigBuilder {
    config: RadikoConfig,
}

impl RadikoConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RadikoConfig::default(),
        }
    }

    /// Replace every endpoint URL
    pub fn with_endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    /// Point all endpoints at another origin, e.g. a local mock server
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.config.endpoints = EndpointConfig::with_base(base);
        self
    }

    /// Set the overall timeout for a single HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http.connect_timeout = timeout;
        self
    }

    /// Set the fallback user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.http.user_agent = user_agent.into();
        self
    }

    /// Route every request through an explicit proxy
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.http.proxy = Some(proxy.into());
        self
    }

    /// Enable or disable system proxy detection
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.config.http.use_system_proxy = enabled;
        self
    }

    /// Pin the partial-key slice instead of trusting auth1
    pub fn with_partial_key_override(mut self, offset: usize, length: usize) -> Self {
        self.config.auth.partial_key_override = Some((offset, length));
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.auth.token_ttl = ttl;
        self
    }

    pub fn with_reauth_period(mut self, period: Duration) -> Self {
        self.config.auth.reauth_period = period;
        self
    }

    pub fn with_default_area(mut self, area: impl Into<String>) -> Self {
        self.config.auth.default_area = area.into();
        self
    }

    /// Set the maximum span of one playlist request
    pub fn with_chunk_span(mut self, span: Duration) -> Self {
        self.config.download.chunk_span = span;
        self
    }

    /// Set the number of segment workers. Zero is raised to one.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.config.download.concurrency = workers.max(1);
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.download.keepalive_interval = interval;
        self
    }

    /// Set the host's rule ceiling
    pub fn with_rule_ceiling(mut self, ceiling: usize) -> Self {
        self.config.rules.ceiling = ceiling;
        self
    }

    /// Replace the URL filters that receive the player rule
    pub fn with_player_url_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.rules.player_url_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// Build the final configuration
    pub fn build(self) -> RadikoConfig {
        self.config
    }
}
