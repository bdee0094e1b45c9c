use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the fund list JSON file. Defaults to `funds.json` in the
    /// platform data directory.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EastmoneyProviderConfig {
    pub quote_base_url: String,
    pub fund_base_url: String,
    pub f10_base_url: String,
    pub quote_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub dividend_timeout_secs: u64,
    pub retry_delay_ms: u64,
}

impl Default for EastmoneyProviderConfig {
    fn default() -> Self {
        EastmoneyProviderConfig {
            quote_base_url: "https://fundgz.1234567.com.cn".to_string(),
            fund_base_url: "https://fund.eastmoney.com".to_string(),
            f10_base_url: "https://fundf10.eastmoney.com".to_string(),
            quote_timeout_secs: 5,
            page_timeout_secs: 10,
            dividend_timeout_secs: 15,
            retry_delay_ms: 1000,
        }
    }
}

impl EastmoneyProviderConfig {
    /// Points every endpoint at a single base url, used against mock servers.
    pub fn with_base_url(base_url: &str) -> Self {
        EastmoneyProviderConfig {
            quote_base_url: base_url.to_string(),
            fund_base_url: base_url.to_string(),
            f10_base_url: base_url.to_string(),
            retry_delay_ms: 10,
            ..Default::default()
        }
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn dividend_timeout(&self) -> Duration {
        Duration::from_secs(self.dividend_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub eastmoney: EastmoneyProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub providers: ProvidersConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to the
    /// built-in defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default().with_env_overrides());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "fundtrack", "fundtrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "fundtrack", "fundtrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.store.path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::default_data_path()?.join("funds.json"))
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_overrides())
    }

    /// `PORT` wins over the configured port, as hosting platforms set it.
    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            debug!("Using port {} from PORT", port);
            self.server.port = port;
        }
        self
    }
}
