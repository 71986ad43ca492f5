use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use scout_pipeline::SourceDefinition;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub workers: WorkerConfig,
    pub scoring: ScoringConfig,
    pub coordinator: CoordinatorSettings,
    pub notifications: NotificationConfig,
    pub sources: Vec<SourceDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub search_concurrency: usize,
    pub scrape_concurrency: usize,
    pub score_concurrency: usize,
    pub alert_concurrency: usize,
    /// Scrape admission cap: at most this many fetches per window.
    pub scrape_rate_limit: u32,
    pub scrape_rate_window_seconds: u64,
    pub fetch_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Qualifying threshold on the 0-1 final-score scale.
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub target_count: u64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// POST alerts here when set; log-only otherwise.
    pub webhook_url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://scout.db".to_string(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            search_concurrency: 1,
            scrape_concurrency: 5,
            score_concurrency: 5,
            alert_concurrency: 5,
            scrape_rate_limit: 100,
            scrape_rate_window_seconds: 60,
            fetch_timeout_seconds: 30,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_poll_attempts: 10,
            target_count: 10,
            max_iterations: 20,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { webhook_url: None }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            workers: WorkerConfig::default(),
            scoring: ScoringConfig::default(),
            coordinator: CoordinatorSettings::default(),
            notifications: NotificationConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("config file not found: {path}"));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else {
            for path in ["config/scout.toml", "scout.toml"] {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("database.url must not be empty");
        }
        if !(0.0..=1.0).contains(&self.scoring.threshold) {
            anyhow::bail!(
                "scoring.threshold must be within [0, 1], got {}",
                self.scoring.threshold
            );
        }
        if self.workers.scrape_concurrency == 0 {
            anyhow::bail!("workers.scrape_concurrency must be at least 1");
        }
        if self.workers.scrape_rate_limit == 0 {
            anyhow::bail!("workers.scrape_rate_limit must be at least 1");
        }
        if self.coordinator.max_poll_attempts == 0 {
            anyhow::bail!("coordinator.max_poll_attempts must be at least 1");
        }
        if self.coordinator.target_count == 0 {
            anyhow::bail!("coordinator.target_count must be at least 1");
        }
        for source in &self.sources {
            if source.name.is_empty() || source.base_url.is_empty() {
                anyhow::bail!("every source needs a name and a base_url");
            }
        }
        Ok(())
    }
}
