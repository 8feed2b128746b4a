use crate::banner::{normalize_domains, BannerGeometry};
use crate::client::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::ConfigError;
use crate::models::{FilterSelection, MAX_BLOCK, MIN_BLOCK};
use crate::notifier::NotifyRule;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: true, port: 9120 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { enabled: false, interval_secs: 3600 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub rules: Vec<NotifyRule>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TickerConfig {
    /// Base URL; `/priorSales` and `/currentListing` are appended.
    pub api_base_url: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    // Maps directly to 'slack_webhook_url' in the YAML file. Empty disables Slack.
    #[serde(default)]
    pub slack_webhook_url: String,

    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
    #[serde(default)]
    pub excluded_domains: Vec<String>,

    #[serde(default)]
    pub filters: FilterSelection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub banner: BannerGeometry,
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_preferences_path() -> String {
    "banner_prefs.json".to_string()
}

impl TickerConfig {
    /// Loads configuration from 'config.yaml' in the current working directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml_content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: TickerConfig = serde_yaml::from_str(yaml)?;
        config.excluded_domains = normalize_domains(&config.excluded_domains);
        config.validate()?;
        Ok(config)
    }

    pub fn slack_webhook(&self) -> Option<&str> {
        let url = self.slack_webhook_url.trim();
        (!url.is_empty()).then_some(url)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base_url is empty".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh_interval_secs must be positive".into()));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::Invalid(format!(
                "page_size must be between {} and {}, got {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE, self.page_size
            )));
        }
        if let Some(block) = self
            .filters
            .block_sizes
            .iter()
            .find(|b| !(MIN_BLOCK..=MAX_BLOCK).contains(*b))
        {
            return Err(ConfigError::Invalid(format!(
                "filter block /{} is outside /{}–/{}",
                block, MIN_BLOCK, MAX_BLOCK
            )));
        }
        if let (Some(from), Some(to)) = (self.filters.date_from, self.filters.date_to) {
            if from > to {
                return Err(ConfigError::Invalid(format!("date_from {} is after date_to {}", from, to)));
            }
        }
        if self.report.enabled && self.report.interval_secs == 0 {
            return Err(ConfigError::Invalid("report.interval_secs must be positive".into()));
        }
        if (self.report.enabled || self.notify.enabled) && self.slack_webhook().is_none() {
            return Err(ConfigError::Invalid(
                "slack_webhook_url is required when report or notify is enabled".into(),
            ));
        }
        Ok(())
    }
}
