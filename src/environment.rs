// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub database_path: PathBuf,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Knobs for talking to the job board. Delays bound the request rate; the
/// board's tolerance is unknown so they stay tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_search_page_delay_ms")]
    pub search_page_delay_ms: u64,
    #[serde(default = "default_enrichment_delay_ms")]
    pub enrichment_delay_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            search_page_delay_ms: default_search_page_delay_ms(),
            enrichment_delay_ms: default_enrichment_delay_ms(),
            page_size: default_page_size(),
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_page_delay(&self) -> Duration {
        Duration::from_millis(self.search_page_delay_ms)
    }

    pub fn enrichment_delay(&self) -> Duration {
        Duration::from_millis(self.enrichment_delay_ms)
    }

    /// Same settings with every delay removed
    pub fn without_delays(mut self) -> Self {
        self.search_page_delay_ms = 0;
        self.enrichment_delay_ms = 0;
        self
    }
}

fn default_port() -> u16 {
    8000
}

fn default_base_url() -> String {
    "https://www.linkedin.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_search_page_delay_ms() -> u64 {
    1000
}

fn default_enrichment_delay_ms() -> u64 {
    2000
}

fn default_page_size() -> usize {
    25
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration for the active environment from `config_path`
    pub fn load(config_path: &Path) -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let mut config = Self::load_from_file(config_path, &environment)?;

        if let Ok(port) = std::env::var("ROCKET_PORT") {
            config.server.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }

        Ok(config)
    }

    fn get_environment() -> String {
        std::env::var("JOB_SCOUT_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn load_from_file(config_path: &Path, environment: &str) -> Result<Self> {
        if !config_path.exists() {
            anyhow::bail!(
                "{} not found. Cannot start without configuration.",
                config_path.display()
            );
        }

        let config_content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let env_config = Self::from_yaml(&config_content, environment)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Self {
            database_path: Self::resolve_path(&env_config.database_path)?,
            ..env_config
        })
    }

    fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(content)?;

        Ok(match environment {
            "production" => config_file.production,
            _ => config_file.local,
        })
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    /// Ensure the database directory exists
    pub async fn ensure_directories(&self) -> Result<()> {
        if let Some(db_parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(db_parent)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create database directory: {}",
                        db_parent.display()
                    )
                })?;
        }

        info!("Database directory ready for {}", self.database_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
local:
  database_path: data/jobs.db
  scraper:
    enrichment_delay_ms: 500
production:
  database_path: /app/data/jobs.db
  server:
    port: 9000
  scraper:
    base_url: https://jobs.example.com
"#;

    #[test]
    fn test_local_section_with_defaults() {
        let config = EnvironmentConfig::from_yaml(SAMPLE, "local").unwrap();
        assert_eq!(config.database_path, PathBuf::from("data/jobs.db"));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.scraper.enrichment_delay(), Duration::from_millis(500));
        assert_eq!(config.scraper.search_page_delay(), Duration::from_secs(1));
        assert_eq!(config.scraper.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.scraper.page_size, 25);
    }

    #[test]
    fn test_production_section() {
        let config = EnvironmentConfig::from_yaml(SAMPLE, "production").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.scraper.base_url, "https://jobs.example.com");
        assert_eq!(config.scraper.enrichment_delay_ms, 2000);
    }

    #[test]
    fn test_unknown_environment_falls_back_to_local() {
        let config = EnvironmentConfig::from_yaml(SAMPLE, "staging").unwrap();
        assert_eq!(config.database_path, PathBuf::from("data/jobs.db"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvironmentConfig::load_from_file(&dir.path().join("config.yaml"), "local")
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
