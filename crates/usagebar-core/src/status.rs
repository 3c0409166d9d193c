//! Status line composition
//!
//! Derives the status text, tooltip and color from a snapshot. Independent of
//! alerting: the color always follows the configured primary metric.

use crate::format::{format_cents, format_reset_date_full};
use crate::models::config::{Config, PrimaryMetric};
use crate::models::usage::{Metric, UsageSnapshot};
use crate::severity::{classify, Severity};

/// Label shown when no segment is eligible
pub const FALLBACK_LABEL: &str = "Usage Stats";

pub const USAGE_ICON: &str = "▮";
pub const LOADING_ICON: &str = "↻";
pub const ERROR_ICON: &str = "✗";

const RULE: &str = "───────────────";

/// Host status bar item
///
/// Setters are idempotent and callable in any state.
pub trait DisplaySurface: Send {
    fn set_text(&mut self, text: &str);
    fn set_tooltip(&mut self, tooltip: &str);
    fn set_color(&mut self, severity: Severity);
    /// Switch to the error background
    fn set_error(&mut self, message: &str);
}

/// Everything the status item shows for one state
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub text: String,
    pub tooltip: String,
    pub color: Severity,
}

/// Severity of a single metric; unlimited or disabled metrics are normal
pub fn metric_severity(snapshot: &UsageSnapshot, config: &Config, metric: Metric) -> Severity {
    let thresholds = match metric {
        Metric::IncludedRequests => &config.alerts.included_request_usage,
        Metric::OnDemand => &config.alerts.on_demand_usage,
    };
    match snapshot.percent(metric) {
        Some(percent) => classify(percent, &thresholds.warning, &thresholds.critical),
        None => Severity::Normal,
    }
}

/// Severity of the metric selected by `statusBar.primaryMetric`
pub fn primary_severity(snapshot: &UsageSnapshot, config: &Config) -> Severity {
    let metric = match config.status_bar.primary_metric {
        PrimaryMetric::IncludedRequest => Metric::IncludedRequests,
        PrimaryMetric::OnDemand => Metric::OnDemand,
    };
    metric_severity(snapshot, config, metric)
}

/// Display line without icon, e.g. `412/500 | $8.50/$10.00`
pub fn display_text(snapshot: &UsageSnapshot, config: &Config) -> String {
    let mode = config.status_bar.display_mode;
    let mut parts = Vec::new();

    if mode.shows_requests() {
        if let Some(requests) = snapshot.included_requests {
            match requests.limit {
                Some(limit) if limit > 0 => {
                    parts.push(format!("{}/{}", requests.count, limit));
                }
                _ => {}
            }
        }
    }

    let on_demand = snapshot.on_demand;
    if mode.shows_on_demand() && on_demand.enabled {
        parts.push(format!(
            "{}/{}",
            format_cents(on_demand.used_cents),
            format_cents(on_demand.limit_cents)
        ));
    }

    if parts.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        parts.join(" | ")
    }
}

/// `Requests: N / M`, or `Requests: N (unlimited)` without a cap
pub fn requests_line(snapshot: &UsageSnapshot) -> Option<String> {
    let requests = snapshot.included_requests?;
    Some(match requests.limit {
        Some(limit) => format!("Requests: {} / {}", requests.count, limit),
        None => format!("Requests: {} (unlimited)", requests.count),
    })
}

/// `On-Demand: $x / $y`, omitted when on-demand is disabled
pub fn on_demand_line(snapshot: &UsageSnapshot) -> Option<String> {
    let on_demand = snapshot.on_demand;
    on_demand.enabled.then(|| {
        format!(
            "On-Demand: {} / {}",
            format_cents(on_demand.used_cents),
            format_cents(on_demand.limit_cents)
        )
    })
}

/// Multi-line detail tooltip
pub fn build_tooltip(snapshot: &UsageSnapshot) -> String {
    let mut lines = vec![FALLBACK_LABEL.to_string(), RULE.to_string()];

    lines.extend(requests_line(snapshot));
    lines.extend(on_demand_line(snapshot));

    lines.push(RULE.to_string());
    lines.push(format!(
        "Resets: {}",
        format_reset_date_full(&snapshot.billing_cycle_end)
    ));
    lines.push(String::new());
    lines.push("Click for details".to_string());

    lines.join("\n")
}

/// Remembers the last rendered text so the loading state can keep it visible
#[derive(Debug, Default)]
pub struct StatusComposer {
    last_display_text: Option<String>,
}

impl StatusComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &UsageSnapshot, config: &Config) -> StatusView {
        let text = display_text(snapshot, config);
        self.last_display_text = Some(text.clone());

        StatusView {
            text: format!("{USAGE_ICON} {text}"),
            tooltip: build_tooltip(snapshot),
            color: primary_severity(snapshot, config),
        }
    }

    /// Last text with the refresh indicator; never blank
    pub fn loading_text(&self) -> String {
        let text = self.last_display_text.as_deref().unwrap_or(FALLBACK_LABEL);
        format!("{LOADING_ICON} {text}")
    }

    pub fn error_view(&self, message: &str) -> StatusView {
        StatusView {
            text: format!("{ERROR_ICON} {FALLBACK_LABEL}"),
            tooltip: format!("Error: {message}"),
            color: Severity::Critical,
        }
    }

    pub fn show(&mut self, display: &mut dyn DisplaySurface, snapshot: &UsageSnapshot, config: &Config) {
        let view = self.render(snapshot, config);
        display.set_text(&view.text);
        display.set_color(view.color);
        display.set_tooltip(&view.tooltip);
    }

    pub fn show_loading(&self, display: &mut dyn DisplaySurface) {
        display.set_text(&self.loading_text());
    }

    pub fn show_error(&self, display: &mut dyn DisplaySurface, message: &str) {
        let view = self.error_view(message);
        display.set_text(&view.text);
        display.set_tooltip(&view.tooltip);
        display.set_error(message);
    }
}

/// Display surface that keeps the last applied values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDisplay {
    pub text: String,
    pub tooltip: String,
    pub color: Severity,
    pub error: Option<String>,
}

impl DisplaySurface for MemoryDisplay {
    fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.tooltip = tooltip.to_string();
    }

    fn set_color(&mut self, severity: Severity) {
        self.color = severity;
        self.error = None;
    }

    fn set_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::DisplayMode;
    use crate::models::usage::{IncludedRequests, OnDemandUsage};
    use chrono::{TimeZone, Utc};

    fn snapshot(requests: Option<IncludedRequests>, on_demand: OnDemandUsage) -> UsageSnapshot {
        UsageSnapshot::new(
            requests,
            on_demand,
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        )
    }

    fn config_with_mode(mode: DisplayMode) -> Config {
        let mut config = Config::default();
        config.status_bar.display_mode = mode;
        config
    }

    #[test]
    fn test_display_text_both_segments() {
        let snap = snapshot(
            Some(IncludedRequests::new(412, Some(500))),
            OnDemandUsage::new(850, 1000, true),
        );
        assert_eq!(
            display_text(&snap, &Config::default()),
            "412/500 | $8.50/$10.00"
        );
    }

    #[test]
    fn test_display_text_respects_mode() {
        let snap = snapshot(
            Some(IncludedRequests::new(412, Some(500))),
            OnDemandUsage::new(850, 1000, true),
        );
        assert_eq!(
            display_text(&snap, &config_with_mode(DisplayMode::Requests)),
            "412/500"
        );
        assert_eq!(
            display_text(&snap, &config_with_mode(DisplayMode::OnDemand)),
            "$8.50/$10.00"
        );
    }

    #[test]
    fn test_display_text_fallback_label() {
        let snap = snapshot(Some(IncludedRequests::new(3, None)), OnDemandUsage::disabled());
        assert_eq!(display_text(&snap, &Config::default()), FALLBACK_LABEL);

        let snap = snapshot(None, OnDemandUsage::new(100, 1000, true));
        assert_eq!(
            display_text(&snap, &config_with_mode(DisplayMode::Requests)),
            FALLBACK_LABEL
        );
    }

    #[test]
    fn test_display_text_skips_zero_request_limit() {
        let snap = snapshot(Some(IncludedRequests::new(5, Some(0))), OnDemandUsage::disabled());
        assert_eq!(display_text(&snap, &Config::default()), FALLBACK_LABEL);

        let snap = snapshot(
            Some(IncludedRequests::new(5, Some(0))),
            OnDemandUsage::new(850, 1000, true),
        );
        assert_eq!(display_text(&snap, &Config::default()), "$8.50/$10.00");
    }

    #[test]
    fn test_color_follows_primary_metric() {
        // Requests critical, on-demand normal
        let snap = snapshot(
            Some(IncludedRequests::new(95, Some(100))),
            OnDemandUsage::new(100, 1000, true),
        );
        let mut config = Config::default();
        assert_eq!(primary_severity(&snap, &config), Severity::Normal);

        config.status_bar.primary_metric = PrimaryMetric::IncludedRequest;
        assert_eq!(primary_severity(&snap, &config), Severity::Critical);
    }

    #[test]
    fn test_disabled_metric_never_colors() {
        let snap = snapshot(None, OnDemandUsage::new(5000, 1000, false));
        assert_eq!(primary_severity(&snap, &Config::default()), Severity::Normal);

        let snap = snapshot(None, OnDemandUsage::new(5000, 0, true));
        assert_eq!(primary_severity(&snap, &Config::default()), Severity::Normal);
    }

    #[test]
    fn test_tooltip_layout() {
        let snap = snapshot(
            Some(IncludedRequests::new(12, None)),
            OnDemandUsage::disabled(),
        );
        let tooltip = build_tooltip(&snap);
        let lines: Vec<&str> = tooltip.lines().collect();

        assert_eq!(lines[0], "Usage Stats");
        assert_eq!(lines[1], RULE);
        assert_eq!(lines[2], "Requests: 12 (unlimited)");
        assert_eq!(lines[3], RULE);
        assert!(lines[4].starts_with("Resets: Feb 1, 2026 UTC ("));
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "Click for details");
    }

    #[test]
    fn test_tooltip_includes_on_demand_when_enabled() {
        let snap = snapshot(
            Some(IncludedRequests::new(12, Some(500))),
            OnDemandUsage::new(250, 2000, true),
        );
        let tooltip = build_tooltip(&snap);
        assert!(tooltip.contains("Requests: 12 / 500\nOn-Demand: $2.50 / $20.00\n"));
    }

    #[test]
    fn test_loading_keeps_last_text() {
        let mut composer = StatusComposer::new();
        assert_eq!(composer.loading_text(), "↻ Usage Stats");

        let snap = snapshot(None, OnDemandUsage::new(850, 1000, true));
        composer.render(&snap, &Config::default());
        assert_eq!(composer.loading_text(), "↻ $8.50/$10.00");
    }

    #[test]
    fn test_error_replaces_text_and_keeps_last_for_loading() {
        let mut composer = StatusComposer::new();
        let mut display = MemoryDisplay::default();
        let snap = snapshot(None, OnDemandUsage::new(850, 1000, true));

        composer.show(&mut display, &snap, &Config::default());
        assert_eq!(display.text, "▮ $8.50/$10.00");
        assert_eq!(display.color, Severity::Critical);

        composer.show_error(&mut display, "Failed to fetch: 401 - Unauthorized");
        assert_eq!(display.text, "✗ Usage Stats");
        assert_eq!(display.tooltip, "Error: Failed to fetch: 401 - Unauthorized");
        assert!(display.error.is_some());

        composer.show_loading(&mut display);
        assert_eq!(display.text, "↻ $8.50/$10.00");
    }
}
