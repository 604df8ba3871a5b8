use anyhow::{Context, Result};
use radiko_engine::RadikoConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "radiko";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory finished downloads are written to
    pub output_dir: PathBuf,

    /// Session file (device identity, token, area). Defaults next to the config file.
    pub session_file: Option<PathBuf>,

    /// Preferred area used until `radiko area` stores another one
    pub default_area: String,

    /// Parallel segment downloads
    pub concurrency: usize,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Connect timeout in seconds
    pub connect_timeout: u64,

    /// Proxy URL (supports http, https, socks5)
    pub proxy: Option<String>,

    /// Honour the system proxy settings when no proxy is set
    pub use_system_proxy: bool,

    /// User agent for requests outside the auth handshake
    pub user_agent: Option<String>,

    /// Minutes between forced re-authentications in daemon mode
    pub reauth_minutes: u64,

    /// Enable colored output
    pub colored_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            session_file: None,
            default_area: "JP13".to_string(),
            concurrency: 4,
            timeout: 30,
            connect_timeout: 10,
            proxy: None,
            use_system_proxy: true,
            user_agent: None,
            reauth_minutes: 65,
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file, or from the default location via confy
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Resolves where the session store lives.
    pub fn session_path(&self, config_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        let config_file = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .context("No configuration path available for the session file")?;
        let dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(dir.join("session.json"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, toml_string).context("Failed to write configuration file")?;
        Ok(())
    }

    pub fn reset(config_path: Option<&Path>) -> Result<PathBuf> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;
        Self::default().save(&path)?;
        Ok(path)
    }

    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }

    /// Engine configuration, with command-line overrides applied on top.
    pub fn engine_config(
        &self,
        proxy: Option<&str>,
        timeout: Option<u64>,
        concurrency: Option<usize>,
    ) -> RadikoConfig {
        let mut builder = RadikoConfig::builder()
            .with_timeout(Duration::from_secs(timeout.unwrap_or(self.timeout)))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_concurrency(concurrency.unwrap_or(self.concurrency))
            .with_default_area(self.default_area.clone())
            .with_reauth_period(Duration::from_secs(self.reauth_minutes.max(1) * 60))
            .with_system_proxy(self.use_system_proxy);

        if let Some(proxy) = proxy.or(self.proxy.as_deref()) {
            builder = builder.with_proxy(proxy);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.with_user_agent(user_agent.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radiko.toml");
        std::fs::write(&path, "default_area = \"JP27\"\nconcurrency = 8\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_area, "JP27");
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.timeout, 30);
    }

    #[test]
    fn test_reset_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("radiko.toml");

        assert_eq!(AppConfig::reset(Some(&path)).unwrap(), path);
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_session_path_follows_config_file() {
        let config = AppConfig::default();
        let path = config
            .session_path(Some(Path::new("/tmp/radiko/radiko.toml")))
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/radiko/session.json"));
    }

    #[test]
    fn test_engine_config_overrides() {
        let config = AppConfig {
            proxy: Some("http://config-proxy:8080".into()),
            ..AppConfig::default()
        };
        let engine = config.engine_config(Some("socks5://cli-proxy:1080"), Some(5), Some(2));
        assert_eq!(engine.http.proxy.as_deref(), Some("socks5://cli-proxy:1080"));
        assert_eq!(engine.http.timeout, Duration::from_secs(5));
        assert_eq!(engine.download.concurrency, 2);
        assert_eq!(engine.auth.reauth_period, Duration::from_secs(65 * 60));
    }
}
