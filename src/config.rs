// src/config.rs
//! Application configuration.
//!
//! Layered: built-in defaults, then the `config.yaml` section of the current
//! environment (if the file exists), then environment variables.

use crate::fetchers::linkedin::url::DEFAULT_GEO_ID;
use crate::fetchers::DetailOptions;
use crate::retry::{Backoff, RetryPolicy};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    pub name: String,
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// LinkedIn geo id used when a profile has no location
    pub default_location: String,
    pub detail_concurrency: usize,
    pub retries: u32,
    pub retry_backoff_ms: u64,
    pub selector_timeout_secs: u64,
    pub run_timeout_secs: Option<u64>,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            default_location: DEFAULT_GEO_ID.to_string(),
            detail_concurrency: 1,
            retries: 3,
            retry_backoff_ms: 0,
            selector_timeout_secs: 10,
            run_timeout_secs: None,
            chrome_executable: None,
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::immediate(self.retries);
        match self.retry_backoff_ms {
            0 => policy,
            ms => policy.with_backoff(Backoff::Fixed(Duration::from_millis(ms))),
        }
    }

    pub fn detail_options(&self) -> DetailOptions {
        DetailOptions::default()
            .with_concurrency(self.detail_concurrency)
            .with_retry(self.retry_policy())
            .with_selector_timeout(self.selector_timeout())
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub job_matching_url: String,
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            job_matching_url: "http://127.0.0.1:5555".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// One environment section of `config.yaml`; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigSection {
    database_path: Option<PathBuf>,
    server: ServerConfig,
    fetch: FetchConfig,
    service: ServiceConfig,
}

impl AppConfig {
    /// Load from `config.yaml` in the working directory and the process
    /// environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let path = Path::new(CONFIG_FILE);
        let yaml = if path.exists() {
            Some(std::fs::read_to_string(path).context("Failed to read config.yaml")?)
        } else {
            info!("No config.yaml found, using defaults");
            None
        };

        let config = Self::from_sources(&environment, yaml.as_deref(), |key| {
            std::env::var(key).ok()
        })?;
        config.resolve_paths()
    }

    fn get_environment() -> String {
        std::env::var("SIXSEVEN_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    pub fn from_sources<F>(environment: &str, yaml: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = match yaml {
            Some(yaml) => {
                let mut sections: HashMap<String, ConfigSection> =
                    serde_yaml::from_str(yaml).context("Failed to parse config.yaml")?;
                sections.remove(environment).unwrap_or_default()
            }
            None => ConfigSection::default(),
        };

        let mut config = Self {
            environment: EnvironmentConfig {
                name: environment.to_string(),
                database_path: section
                    .database_path
                    .unwrap_or_else(|| PathBuf::from("data/sixseven.db")),
            },
            server: section.server,
            fetch: section.fetch,
            service: section.service,
        };

        if let Some(path) = env("DATABASE_PATH") {
            config.environment.database_path = PathBuf::from(path);
        }
        if let Some(port) = env("PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {}", port))?;
        }
        if let Some(url) = env("JOB_MATCHING_API_URL") {
            config.service.job_matching_url = url;
        }
        if let Some(executable) = env("CHROME_EXECUTABLE") {
            config.fetch.chrome_executable = Some(PathBuf::from(executable));
        }
        if let Some(secs) = env("FETCH_RUN_TIMEOUT_SECS") {
            config.fetch.run_timeout_secs = Some(secs.parse().with_context(|| {
                format!("FETCH_RUN_TIMEOUT_SECS must be a number of seconds, got {}", secs)
            })?);
        }

        Ok(config)
    }

    fn resolve_paths(mut self) -> Result<Self> {
        if self.environment.database_path.is_relative() {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            self.environment.database_path = current_dir.join(&self.environment.database_path);
        }
        Ok(self)
    }
}
