//! Usage snapshot models
//!
//! A snapshot is produced fresh on every poll and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two independently tracked usage metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    /// Request count against the plan's included request cap
    IncludedRequests,
    /// On-demand spend in cents against the on-demand limit
    OnDemand,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::IncludedRequests => "Requests",
            Metric::OnDemand => "On-Demand",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Included request usage for the tracked model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedRequests {
    /// Requests used this cycle
    pub count: u64,
    /// Request cap (None = unlimited)
    pub limit: Option<u64>,
}

impl IncludedRequests {
    pub fn new(count: u64, limit: Option<u64>) -> Self {
        Self { count, limit }
    }

    /// Usage percentage, or None when there is no finite, non-zero cap
    pub fn percent(&self) -> Option<f64> {
        match self.limit {
            Some(limit) if limit > 0 => Some(self.count as f64 * 100.0 / limit as f64),
            _ => None,
        }
    }
}

/// On-demand (pay-as-you-go) spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDemandUsage {
    pub used_cents: u64,
    pub limit_cents: u64,
    pub enabled: bool,
}

impl OnDemandUsage {
    pub fn new(used_cents: u64, limit_cents: u64, enabled: bool) -> Self {
        Self {
            used_cents,
            limit_cents,
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0, false)
    }

    /// Usage percentage, or None when disabled or the limit is zero
    pub fn percent(&self) -> Option<f64> {
        if !self.enabled || self.limit_cents == 0 {
            return None;
        }
        Some(self.used_cents as f64 * 100.0 / self.limit_cents as f64)
    }
}

/// Combined usage reading produced by one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// None when the usage API carries no request-metered model
    pub included_requests: Option<IncludedRequests>,
    pub on_demand: OnDemandUsage,
    /// End of the current billing cycle; a change signals rollover
    pub billing_cycle_end: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn new(
        included_requests: Option<IncludedRequests>,
        on_demand: OnDemandUsage,
        billing_cycle_end: DateTime<Utc>,
    ) -> Self {
        Self {
            included_requests,
            on_demand,
            billing_cycle_end,
        }
    }

    /// Percentage for a metric, None when the metric is unlimited or disabled
    pub fn percent(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::IncludedRequests => self.included_requests.and_then(|r| r.percent()),
            Metric::OnDemand => self.on_demand.percent(),
        }
    }
}
