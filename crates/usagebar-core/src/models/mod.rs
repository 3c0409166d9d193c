//! Data models for usagebar

pub mod api;
pub mod config;
pub mod usage;

pub use api::{CombinedUsage, ModelUsage, UsageResponse, UsageSummaryResponse};
pub use config::{Config, DisplayMode, PrimaryMetric, ThresholdSet};
pub use usage::{IncludedRequests, Metric, OnDemandUsage, UsageSnapshot};
