use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resource::screens::DASHBOARD_METRICS_PATH;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Screen shown at startup (e.g. "samples"); defaults to test requests.
  pub default_screen: Option<String>,
  #[serde(default)]
  pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// REST base url, e.g. https://emr.example.org/openmrs/ws/rest/v1
  pub url: String,
  /// Basic-auth user. The password is read from LABQ_API_PASSWORD.
  pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
  #[serde(default = "default_debounce_ms")]
  pub search_debounce_ms: u64,
  #[serde(default = "default_debounce_ms")]
  pub metrics_debounce_ms: u64,
  #[serde(default = "default_dashboard_metrics_path")]
  pub dashboard_metrics_path: String,
}

fn default_debounce_ms() -> u64 {
  300
}

fn default_dashboard_metrics_path() -> String {
  DASHBOARD_METRICS_PATH.to_string()
}

impl Default for ControllerConfig {
  fn default() -> Self {
    Self {
      search_debounce_ms: default_debounce_ms(),
      metrics_debounce_ms: default_debounce_ms(),
      dashboard_metrics_path: default_dashboard_metrics_path(),
    }
  }
}

impl ControllerConfig {
  pub fn search_debounce(&self) -> Duration {
    Duration::from_millis(self.search_debounce_ms)
  }

  pub fn metrics_debounce(&self) -> Duration {
    Duration::from_millis(self.metrics_debounce_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./labq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/labq/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = match explicit_path {
      Some(p) if p.exists() => p.to_path_buf(),
      Some(p) => return Err(eyre!("Config file not found: {}", p.display())),
      None => Self::find_config_file().ok_or_else(|| {
        eyre!(
          "No configuration file found. Create one at ~/.config/labq/config.yaml \
           with at least an `api.url` entry."
        )
      })?,
    };

    let contents = std::fs::read_to_string(&path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    Self::from_yaml(&contents).map_err(|e| eyre!("{} ({})", e, path.display()))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("labq.yaml");
    if local.exists() {
      return Some(local);
    }

    dirs::config_dir()
      .map(|dir| dir.join("labq").join("config.yaml"))
      .filter(|path| path.exists())
  }

  /// Directory for the log file: $XDG_DATA_HOME/labq.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;
    Ok(data_dir.join("labq"))
  }

  /// Get the API password from the environment.
  pub fn get_password() -> Result<String> {
    std::env::var("LABQ_API_PASSWORD")
      .map_err(|_| eyre!("API password not found. Set the LABQ_API_PASSWORD environment variable."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  url: https://emr.example.org/ws/rest/v1\n").unwrap();
    assert_eq!(config.api.url, "https://emr.example.org/ws/rest/v1");
    assert!(config.api.username.is_none());
    assert!(config.default_screen.is_none());
    assert_eq!(config.controller.search_debounce(), Duration::from_millis(300));
    assert_eq!(config.controller.metrics_debounce(), Duration::from_millis(300));
    assert_eq!(config.controller.dashboard_metrics_path, DASHBOARD_METRICS_PATH);
  }

  #[test]
  fn test_partial_controller_section() {
    let yaml = r#"
api:
  url: http://localhost:8080/openmrs/ws/rest/v1
  username: admin
default_screen: samples
controller:
  search_debounce_ms: 0
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.api.username.as_deref(), Some("admin"));
    assert_eq!(config.default_screen.as_deref(), Some("samples"));
    assert_eq!(config.controller.search_debounce(), Duration::ZERO);
    assert_eq!(config.controller.metrics_debounce_ms, 300);
  }

  #[test]
  fn test_missing_api_is_error() {
    assert!(Config::from_yaml("default_screen: samples\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/labq.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
