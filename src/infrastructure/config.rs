use crate::application::aggregator::AggregatorOptions;
use crate::application::anomaly_detector::DEFAULT_THRESHOLD;
use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub metric_source: MetricSourceSettings,
    pub aggregator: AggregatorSettings,
    pub controller: ControllerSettings,
    pub views: ViewsSettings,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Http,
    #[default]
    Static,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricSourceSettings {
    pub mode: SourceMode,
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MetricSourceSettings {
    fn default() -> Self {
        Self {
            mode: SourceMode::Static,
            base_url: None,
            token: None,
            timeout_secs: 10,
        }
    }
}

impl MetricSourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AggregatorSettings {
    pub top_n: usize,
    pub min_stock_threshold: u64,
    pub sales_fraction: f64,
    pub seed: Option<u64>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        let options = AggregatorOptions::default();
        Self {
            top_n: options.top_n,
            min_stock_threshold: options.min_stock_threshold,
            sales_fraction: options.sales_fraction,
            seed: None,
        }
    }
}

impl AggregatorSettings {
    pub fn to_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            top_n: self.top_n,
            min_stock_threshold: self.min_stock_threshold,
            sales_fraction: self.sales_fraction.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControllerSettings {
    pub auto_refresh: bool,
    pub auto_refresh_interval_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            auto_refresh: false,
            auto_refresh_interval_secs: 30,
        }
    }
}

impl ControllerSettings {
    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewsSettings {
    pub storage_dir: PathBuf,
}

impl Default for ViewsSettings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("data/views"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub anomaly_threshold: f64,
    pub forecast_periods: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_THRESHOLD,
            forecast_periods: 3,
        }
    }
}

/// Reads `config/dashboard.*` when present, then `DASHBOARD__SECTION__KEY`
/// environment overrides.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("Failed to load dashboard configuration")?;

    settings
        .try_deserialize()
        .context("Invalid dashboard configuration")
}
