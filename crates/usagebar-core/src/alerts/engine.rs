//! Alert engine
//!
//! Owns one [`TriggeredThresholds`] per metric and turns newly crossed
//! thresholds into notifications.

use super::notifier::{dispatch, Notifier, RefreshCallback};
use super::tracker::TriggeredThresholds;
use crate::format::{format_cents, format_reset_date_full};
use crate::models::config::{Config, ThresholdSet};
use crate::models::usage::{Metric, UsageSnapshot};
use crate::severity::Severity;
use crate::status::{on_demand_line, primary_severity, requests_line};
use std::sync::Arc;
use tracing::{debug, info};

/// Alert emitted for a single newly crossed threshold
#[derive(Debug, Clone, PartialEq)]
pub struct FiredAlert {
    pub metric: Metric,
    pub percent: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
}

pub struct AlertEngine {
    included_requests: TriggeredThresholds,
    on_demand: TriggeredThresholds,
    notifier: Arc<dyn Notifier>,
}

impl AlertEngine {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            included_requests: TriggeredThresholds::new(),
            on_demand: TriggeredThresholds::new(),
            notifier,
        }
    }

    /// Read-only view of a metric's triggered thresholds
    pub fn triggered(&self, metric: Metric) -> &TriggeredThresholds {
        match metric {
            Metric::IncludedRequests => &self.included_requests,
            Metric::OnDemand => &self.on_demand,
        }
    }

    fn triggered_mut(&mut self, metric: Metric) -> &mut TriggeredThresholds {
        match metric {
            Metric::IncludedRequests => &mut self.included_requests,
            Metric::OnDemand => &mut self.on_demand,
        }
    }

    /// Check one metric and notify for the highest newly crossed threshold
    ///
    /// `describe` renders the usage part of the message, e.g. `Requests: 85/100`.
    pub fn check_and_fire(
        &mut self,
        metric: Metric,
        percent: f64,
        thresholds: &ThresholdSet,
        describe: &str,
        on_refresh: &RefreshCallback,
    ) -> Option<FiredAlert> {
        let crossing = self.triggered_mut(metric).check_and_fire(percent, thresholds)?;

        let message = format!(
            "{} ({}%) - Passed {}% threshold",
            describe,
            percent.round(),
            crossing.value
        );

        info!(
            metric = %metric,
            percent,
            threshold = crossing.value,
            severity = %crossing.severity,
            "Usage threshold crossed"
        );
        dispatch(&self.notifier, &message, crossing.severity, on_refresh);

        Some(FiredAlert {
            metric,
            percent,
            threshold: crossing.value,
            severity: crossing.severity,
            message,
        })
    }

    /// Check both metrics; unlimited or disabled metrics are skipped
    pub fn check_all_thresholds(
        &mut self,
        snapshot: &UsageSnapshot,
        config: &Config,
        on_refresh: &RefreshCallback,
    ) -> Vec<FiredAlert> {
        let mut fired = Vec::new();

        if let Some(requests) = snapshot.included_requests {
            if let (Some(percent), Some(limit)) = (requests.percent(), requests.limit) {
                let describe = format!("Requests: {}/{}", requests.count, limit);
                fired.extend(self.check_and_fire(
                    Metric::IncludedRequests,
                    percent,
                    &config.alerts.included_request_usage,
                    &describe,
                    on_refresh,
                ));
            }
        }

        let on_demand = snapshot.on_demand;
        if let Some(percent) = on_demand.percent() {
            let describe = format!(
                "On-Demand: {}/{}",
                format_cents(on_demand.used_cents),
                format_cents(on_demand.limit_cents)
            );
            fired.extend(self.check_and_fire(
                Metric::OnDemand,
                percent,
                &config.alerts.on_demand_usage,
                &describe,
                on_refresh,
            ));
        }

        fired
    }

    /// Mark already exceeded thresholds on both metrics without notifying
    pub fn mark_all_exceeded(&mut self, snapshot: &UsageSnapshot, config: &Config) {
        if let Some(percent) = snapshot.percent(Metric::IncludedRequests) {
            self.included_requests
                .mark_all_exceeded(percent, &config.alerts.included_request_usage);
        }
        if let Some(percent) = snapshot.percent(Metric::OnDemand) {
            self.on_demand
                .mark_all_exceeded(percent, &config.alerts.on_demand_usage);
        }
        debug!(
            included_requests = self.included_requests.len(),
            on_demand = self.on_demand.len(),
            "Marked exceeded thresholds"
        );
    }

    pub fn reset(&mut self, metric: Metric) {
        self.triggered_mut(metric).reset();
    }

    pub fn reset_all(&mut self) {
        self.included_requests.reset();
        self.on_demand.reset();
    }

    /// Notify with a one-line usage summary and return the message
    pub fn show_usage_summary(
        &self,
        snapshot: &UsageSnapshot,
        config: &Config,
        on_refresh: &RefreshCallback,
    ) -> String {
        let message = usage_summary(snapshot);
        let severity = primary_severity(snapshot, config);
        dispatch(&self.notifier, &message, severity, on_refresh);
        message
    }
}

/// Summary text: requests, on-demand spend and reset date joined by ` | `
pub fn usage_summary(snapshot: &UsageSnapshot) -> String {
    let mut parts = Vec::new();

    if let Some(line) = requests_line(snapshot) {
        parts.push(line);
    }
    if let Some(line) = on_demand_line(snapshot) {
        parts.push(line);
    }
    parts.push(format!(
        "Resets: {}",
        format_reset_date_full(&snapshot.billing_cycle_end)
    ));

    parts.join(" | ")
}
