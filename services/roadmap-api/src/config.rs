//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys are loaded from the GEMINI_API_KEYS env var (comma-separated)
//! or api_keys_file, never stored in the TOML directly to avoid leaking
//! secrets. The database URL likewise comes from DATABASE_URL only.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub batch: BatchSettings,
    pub storage: StorageConfig,
    #[serde(skip)]
    pub api_keys: Vec<Secret<String>>,
    #[serde(skip)]
    pub database_url: Option<Secret<String>>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Generation endpoint settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Path to a file with one API key per line (alternative to the
    /// GEMINI_API_KEYS env var)
    pub api_keys_file: Option<PathBuf>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        let defaults = gemini::ClientConfig::default();
        Self {
            base_url: defaults.base_url,
            model: defaults.model,
            timeout_secs: defaults.timeout.as_secs(),
            api_keys_file: None,
        }
    }
}

/// Key pool rate-limit knobs
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub window_secs: u64,
    pub max_calls_per_window: usize,
    pub min_spacing_ms: u64,
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        let defaults = keypool::PoolConfig::default();
        Self {
            window_secs: defaults.window.as_secs(),
            max_calls_per_window: defaults.max_calls_per_window,
            min_spacing_ms: defaults.min_spacing.as_millis() as u64,
            failure_threshold: defaults.failure_threshold,
            cooldown_secs: defaults.cooldown.as_secs(),
        }
    }
}

/// Batch orchestrator pacing knobs
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub batch_pause_ms: u64,
    pub retry_delay_ms: u64,
    pub max_waits: u32,
}

impl Default for BatchSettings {
    fn default() -> Self {
        let defaults = roadmap::BatchOptions::default();
        Self {
            batch_pause_ms: defaults.batch_pause.as_millis() as u64,
            retry_delay_ms: defaults.retry_delay.as_millis() as u64,
            max_waits: defaults.max_waits,
        }
    }
}

/// Persistence settings
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Local JSON fallback file, used when the database is absent or down
    pub fallback_path: PathBuf,
}

fn default_max_connections() -> usize {
    1000
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables.
    ///
    /// API key resolution order:
    /// 1. GEMINI_API_KEYS env var (comma-separated)
    /// 2. api_keys_file path from config (one key per line)
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.gemini.base_url.starts_with("http://")
            && !config.gemini.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "gemini.base_url must start with http:// or https://, got: {}",
                config.gemini.base_url
            )));
        }

        if config.gemini.timeout_secs == 0 {
            return Err(common::Error::Config(
                "gemini.timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }

        // Resolve API keys: env var takes precedence over file
        if let Ok(raw) = std::env::var("GEMINI_API_KEYS") {
            config.api_keys = split_keys(&raw);
        } else if let Some(ref key_file) = config.gemini.api_keys_file {
            let raw = std::fs::read_to_string(key_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read api_keys_file {}: {e}",
                    key_file.display()
                ))
            })?;
            config.api_keys = raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| Secret::new(l.to_owned()))
                .collect();
        }

        if config.api_keys.is_empty() {
            return Err(common::Error::NoKeySource);
        }

        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.trim().is_empty()
        {
            config.database_url = Some(Secret::new(url));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("roadmap-api.toml")
    }

    pub fn pool_config(&self) -> keypool::PoolConfig {
        keypool::PoolConfig {
            window: Duration::from_secs(self.pool.window_secs),
            max_calls_per_window: self.pool.max_calls_per_window,
            min_spacing: Duration::from_millis(self.pool.min_spacing_ms),
            failure_threshold: self.pool.failure_threshold,
            cooldown: Duration::from_secs(self.pool.cooldown_secs),
        }
    }

    pub fn client_config(&self) -> gemini::ClientConfig {
        let defaults = gemini::ClientConfig::default();
        gemini::ClientConfig {
            base_url: self.gemini.base_url.clone(),
            model: self.gemini.model.clone(),
            timeout: Duration::from_secs(self.gemini.timeout_secs),
            ..defaults
        }
    }

    pub fn batch_options(&self) -> roadmap::BatchOptions {
        roadmap::BatchOptions {
            batch_pause: Duration::from_millis(self.batch.batch_pause_ms),
            retry_delay: Duration::from_millis(self.batch.retry_delay_ms),
            max_waits: self.batch.max_waits,
        }
    }
}

fn split_keys(raw: &str) -> Vec<Secret<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| Secret::new(k.to_owned()))
        .collect()
}
