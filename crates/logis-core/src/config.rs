use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
pub const API_URL_ENV: &str = "LOGIS_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub health_timeout_secs: Option<u64>,
    pub chat_timeout_secs: Option<u64>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: Some(DEFAULT_API_URL.to_string()),
            health_timeout_secs: Some(DEFAULT_HEALTH_TIMEOUT_SECS),
            chat_timeout_secs: None,
            log_filter: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Base URL of the Logis API: env var first, then config, then the default.
    pub fn api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// A `--api-url` flag beats everything `api_url` consults.
    pub fn resolve_api_url(&self, flag: Option<&str>) -> String {
        flag.filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.api_url())
    }

    pub fn health_timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(
            self.health_timeout_secs.unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS),
        ))
    }

    pub fn chat_timeout(&self) -> Option<Duration> {
        self.chat_timeout_secs.map(Duration::from_secs)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("logis").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.health_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.chat_timeout(), None);
    }

    #[test]
    fn written_file_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            api_url: Some("http://10.0.0.7:8000".to_string()),
            health_timeout_secs: Some(2),
            chat_timeout_secs: Some(90),
            log_filter: Some("logis_core=debug".to_string()),
        };
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.chat_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn partial_file_leaves_other_fields_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"chat_timeout_secs": 30}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_url, None);
        assert_eq!(loaded.chat_timeout_secs, Some(30));
        assert_eq!(loaded.health_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    // The only test touching LOGIS_API_URL, so parallel tests can't race on it
    #[test]
    fn api_url_precedence() {
        let file = Config {
            api_url: Some("http://inventario.local:8000".to_string()),
            ..Config::default()
        };
        let unset = Config::default();

        std::env::remove_var(API_URL_ENV);
        assert_eq!(file.api_url(), "http://inventario.local:8000");
        assert_eq!(unset.api_url(), DEFAULT_API_URL);

        std::env::set_var(API_URL_ENV, "http://10.0.0.7:8000");
        assert_eq!(file.api_url(), "http://10.0.0.7:8000");
        assert_eq!(unset.api_url(), "http://10.0.0.7:8000");
        assert_eq!(
            file.resolve_api_url(Some("http://flag:9000")),
            "http://flag:9000"
        );
        assert_eq!(file.resolve_api_url(None), "http://10.0.0.7:8000");

        std::env::set_var(API_URL_ENV, "   ");
        assert_eq!(file.api_url(), "http://inventario.local:8000");
        assert_eq!(unset.api_url(), DEFAULT_API_URL);
        assert_eq!(unset.resolve_api_url(Some("")), DEFAULT_API_URL);

        std::env::remove_var(API_URL_ENV);
    }
}
