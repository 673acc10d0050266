use crate::error::ConfigError;
use crate::simulation::DEFAULT_MULTIPLIER;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TICKER: &str = "AAPL";
pub const DEFAULT_START_DATE: &str = "2020-01-01";
pub const DEFAULT_END_DATE: &str = "2024-07-31";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8050;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataProvider {
    Yahoo,
    Csv,
}

/// Per-IP token bucket on the simulate route: up to `burst_size` requests at
/// once, then one more every `replenish_every_secs` seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    pub replenish_every_secs: u64,
    pub burst_size: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            replenish_every_secs: 10,
            burst_size: 20,
        }
    }
}

// What the page pre-fills before the first run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiDefaults {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for UiDefaults {
    fn default() -> Self {
        Self {
            ticker: DEFAULT_TICKER.to_string(),
            start_date: default_date(DEFAULT_START_DATE),
            end_date: default_date(DEFAULT_END_DATE),
        }
    }
}

fn default_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap_or_default()
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct ConfigYaml {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub data_provider: DataProvider,
    pub yahoo_base_url: String,
    pub request_timeout_secs: u64,
    pub random_agent: bool,
    pub data_dir: PathBuf,
    pub multiplier: f64,
    pub defaults: UiDefaults,
    pub rate_limit: Option<RateLimit>,
}

impl Default for ConfigYaml {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            data_provider: DataProvider::Yahoo,
            yahoo_base_url: crate::yahoo::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            random_agent: true,
            data_dir: PathBuf::from("data"),
            multiplier: DEFAULT_MULTIPLIER,
            defaults: UiDefaults::default(),
            rate_limit: Some(RateLimit::default()),
        }
    }
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub data_provider: DataProvider,
    pub yahoo_base_url: String,
    pub request_timeout: Duration,
    pub random_agent: bool,
    pub data_dir: PathBuf,
    pub multiplier: f64,
    pub defaults: UiDefaults,
    pub rate_limit: Option<RateLimit>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from(ConfigYaml::default())
    }
}

impl From<ConfigYaml> for AppConfig {
    fn from(yaml: ConfigYaml) -> Self {
        Self {
            environment: yaml.environment,
            host: yaml.host,
            port: yaml.port,
            debug: yaml.debug,
            data_provider: yaml.data_provider,
            yahoo_base_url: yaml.yahoo_base_url,
            request_timeout: Duration::from_secs(yaml.request_timeout_secs),
            random_agent: yaml.random_agent,
            data_dir: yaml.data_dir,
            multiplier: yaml.multiplier,
            defaults: yaml.defaults,
            rate_limit: yaml.rate_limit,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)?
        } else {
            Self::from_vars(|key| env::var(key).ok())
        };
        config.validate()?;
        Ok(config)
    }

    // Load configuration from YAML file
    pub fn from_yaml(file_path: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, ConfigError> {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)?;
        Ok(Self::from(yaml_config))
    }

    /// Server settings from variables; everything else keeps its default.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }

        config.port = lookup("PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        config.debug = lookup("DEBUG")
            .and_then(|s| parse_flag(&s))
            .unwrap_or(false);

        if let Some(environment) = lookup("ENVIRONMENT") {
            config.environment = environment;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: String| ConfigError::Invalid {
            key: key.to_string(),
            reason,
        };

        if !self.multiplier.is_finite() {
            return Err(invalid("multiplier", format!("{} is not a finite number", self.multiplier)));
        }
        if self.defaults.start_date >= self.defaults.end_date {
            return Err(invalid(
                "defaults",
                format!("start_date {} must be before end_date {}", self.defaults.start_date, self.defaults.end_date),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("request_timeout_secs", "must be greater than zero".to_string()));
        }
        if let Some(limit) = &self.rate_limit {
            if limit.replenish_every_secs == 0 || limit.burst_size == 0 {
                return Err(invalid(
                    "rate_limit",
                    "replenish_every_secs and burst_size must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "pricesim=debug,tower_http=debug"
        } else {
            "pricesim=info,tower_http=info"
        }
    }
}
