//! Configuration models for usagebar settings
//!
//! Settings are read as raw JSON and validated one setting at a time. An
//! invalid setting falls back to its default without failing the whole load.

use crate::error::CoreError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Which segments the status line shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// Requests and on-demand spend (default)
    #[default]
    Both,
    /// Request count only
    Requests,
    /// On-demand spend only
    OnDemand,
}

impl DisplayMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "both" => Some(Self::Both),
            "requests" => Some(Self::Requests),
            "onDemand" => Some(Self::OnDemand),
            _ => None,
        }
    }

    pub fn shows_requests(&self) -> bool {
        matches!(self, Self::Both | Self::Requests)
    }

    pub fn shows_on_demand(&self) -> bool {
        matches!(self, Self::Both | Self::OnDemand)
    }
}

/// Metric that drives the status color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimaryMetric {
    IncludedRequest,
    /// On-demand spend (default)
    #[default]
    OnDemand,
}

impl PrimaryMetric {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "includedRequest" => Some(Self::IncludedRequest),
            "onDemand" => Some(Self::OnDemand),
            _ => None,
        }
    }
}

/// Warning and critical percentages for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSet {
    #[serde(rename = "warningPercentageThresholds")]
    pub warning: Vec<f64>,
    #[serde(rename = "criticalPercentageThresholds")]
    pub critical: Vec<f64>,
}

impl ThresholdSet {
    pub fn new(warning: Vec<f64>, critical: Vec<f64>) -> Self {
        Self { warning, critical }
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            warning: vec![50.0, 60.0, 70.0],
            critical: vec![80.0, 90.0, 95.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBarConfig {
    pub display_mode: DisplayMode,
    pub primary_metric: PrimaryMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Model key whose request count is tracked
    pub included_request_model_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            included_request_model_key: DEFAULT_MODEL_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsConfig {
    pub included_request_usage: ThresholdSet,
    pub on_demand_usage: ThresholdSet,
}

/// Effective usagebar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Show a usage summary after the first successful fetch
    pub notify_on_startup: bool,
    /// Seconds between polls (> 0)
    pub poll_interval_seconds: f64,
    pub status_bar: StatusBarConfig,
    pub api: ApiConfig,
    pub alerts: AlertsConfig,
}

pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 60.0;
/// Longest accepted poll interval (one day)
pub const MAX_POLL_INTERVAL_SECS: f64 = 86_400.0;
pub const DEFAULT_MODEL_KEY: &str = "gpt-4";

const SETTINGS_FILE: &str = "settings.json";

impl Default for Config {
    fn default() -> Self {
        Self {
            notify_on_startup: true,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
            status_bar: StatusBarConfig::default(),
            api: ApiConfig::default(),
            alerts: AlertsConfig::default(),
        }
    }
}

impl Config {
    /// Poll period; an unusable seconds value yields the default period
    pub fn poll_interval(&self) -> Duration {
        poll_period(self.poll_interval_seconds)
            .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS as u64))
    }

    /// Build a config from raw settings JSON, substituting defaults per setting
    pub fn from_value(raw: &Value) -> Self {
        let defaults = Self::default();

        let notify_on_startup = match lookup(raw, "notifyOnStartup") {
            Some(Value::Bool(b)) => *b,
            other => fallback("notifyOnStartup", other, defaults.notify_on_startup),
        };

        let poll_interval_seconds = match lookup(raw, "pollIntervalSeconds").and_then(Value::as_f64) {
            Some(secs) if poll_period(secs).is_some() => secs,
            _ => fallback(
                "pollIntervalSeconds",
                lookup(raw, "pollIntervalSeconds"),
                defaults.poll_interval_seconds,
            ),
        };

        let display_mode = match lookup(raw, "statusBar.displayMode")
            .and_then(Value::as_str)
            .and_then(DisplayMode::parse)
        {
            Some(mode) => mode,
            None => fallback(
                "statusBar.displayMode",
                lookup(raw, "statusBar.displayMode"),
                defaults.status_bar.display_mode,
            ),
        };

        let primary_metric = match lookup(raw, "statusBar.primaryMetric")
            .and_then(Value::as_str)
            .and_then(PrimaryMetric::parse)
        {
            Some(metric) => metric,
            None => fallback(
                "statusBar.primaryMetric",
                lookup(raw, "statusBar.primaryMetric"),
                defaults.status_bar.primary_metric,
            ),
        };

        let included_request_model_key = match lookup(raw, "api.includedRequestModelKey")
            .and_then(Value::as_str)
        {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => fallback(
                "api.includedRequestModelKey",
                lookup(raw, "api.includedRequestModelKey"),
                defaults.api.included_request_model_key,
            ),
        };

        let alerts = AlertsConfig {
            included_request_usage: threshold_set(
                raw,
                "alerts.includedRequestUsage",
                &defaults.alerts.included_request_usage,
            ),
            on_demand_usage: threshold_set(
                raw,
                "alerts.onDemandUsage",
                &defaults.alerts.on_demand_usage,
            ),
        };

        Self {
            notify_on_startup,
            poll_interval_seconds,
            status_bar: StatusBarConfig {
                display_mode,
                primary_metric,
            },
            api: ApiConfig {
                included_request_model_key,
            },
            alerts,
        }
    }

    /// Load settings from a JSON file
    ///
    /// A missing file yields defaults. An unreadable or malformed file is logged
    /// and also yields defaults (graceful degradation).
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read settings, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(raw) => Self::from_value(&raw),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed settings JSON, using defaults");
                Self::default()
            }
        }
    }

    /// Persist settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    /// Default settings path: `<config_dir>/usagebar/settings.json`
    pub fn default_path() -> std::result::Result<PathBuf, CoreError> {
        let dir = dirs::config_dir().ok_or(CoreError::ConfigDirNotFound)?;
        Ok(dir.join("usagebar").join(SETTINGS_FILE))
    }
}

/// Look up a dotted key, accepting both nested objects and flat dotted keys
/// Non-zero period no longer than a day, None otherwise
fn poll_period(secs: f64) -> Option<Duration> {
    if secs > MAX_POLL_INTERVAL_SECS {
        return None;
    }
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|period| !period.is_zero())
}

fn lookup<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(value) = raw.get(key) {
        return Some(value);
    }
    key.split('.').try_fold(raw, |node, part| node.get(part))
}

fn fallback<T>(key: &str, value: Option<&Value>, default: T) -> T {
    if let Some(value) = value {
        debug!(key, %value, "Invalid setting, using default");
    }
    default
}

fn threshold_set(raw: &Value, prefix: &str, defaults: &ThresholdSet) -> ThresholdSet {
    let warning_key = format!("{prefix}.warningPercentageThresholds");
    let critical_key = format!("{prefix}.criticalPercentageThresholds");

    ThresholdSet {
        warning: validate_thresholds(&warning_key, lookup(raw, &warning_key), &defaults.warning),
        critical: validate_thresholds(&critical_key, lookup(raw, &critical_key), &defaults.critical),
    }
}

/// Validate a threshold array; any invalid element rejects the whole array
///
/// # Examples
/// ```
/// use serde_json::json;
/// use usagebar_core::models::config::validate_thresholds;
///
/// let default = [80.0, 90.0];
/// assert_eq!(validate_thresholds("t", Some(&json!([50, 60])), &default), vec![50.0, 60.0]);
/// assert_eq!(validate_thresholds("t", Some(&json!([150])), &default), vec![80.0, 90.0]);
/// assert_eq!(validate_thresholds("t", Some(&json!("nope")), &default), vec![80.0, 90.0]);
/// ```
pub fn validate_thresholds(key: &str, value: Option<&Value>, default: &[f64]) -> Vec<f64> {
    let parsed = value.and_then(Value::as_array).and_then(|items| {
        items
            .iter()
            .map(|item| item.as_f64().filter(|t| (0.0..=100.0).contains(t)))
            .collect::<Option<Vec<f64>>>()
    });

    match parsed {
        Some(thresholds) => thresholds,
        None => fallback(key, value, default.to_vec()),
    }
}
