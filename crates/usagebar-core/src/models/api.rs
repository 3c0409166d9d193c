//! Usage API response models
//!
//! The usage endpoint returns a map of model key -> request details next to a
//! `startOfMonth` field. The summary endpoint carries billing cycle bounds and
//! on-demand spend in cents.

use crate::error::CoreError;
use crate::models::usage::{IncludedRequests, OnDemandUsage, UsageSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key in the usage response that is never a model entry
const START_OF_MONTH_KEY: &str = "startOfMonth";

/// Request details for a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    #[serde(default)]
    pub num_requests: u64,
    pub num_requests_total: u64,
    #[serde(default)]
    pub num_tokens: u64,
    /// Request cap (None = unlimited)
    #[serde(default)]
    pub max_request_usage: Option<u64>,
    #[serde(default)]
    pub max_token_usage: Option<u64>,
}

impl ModelUsage {
    /// Check whether a JSON value has the model usage shape
    ///
    /// `numRequestsTotal` must be a number and `maxRequestUsage` a number or null.
    pub fn matches_shape(value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };

        let total_ok = obj.get("numRequestsTotal").is_some_and(Value::is_number);
        let max_ok = matches!(
            obj.get("maxRequestUsage"),
            Some(Value::Null) | Some(Value::Number(_))
        );

        total_ok && max_ok
    }
}

/// Response of the per-model usage endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageResponse {
    pub entries: Map<String, Value>,
}

impl UsageResponse {
    /// Find the model key to read request usage from
    ///
    /// Prefers `preferred_key` when it has the model usage shape, otherwise falls
    /// back to the first other key with that shape.
    pub fn find_model_key(&self, preferred_key: &str) -> Option<&str> {
        if let Some((key, value)) = self.entries.get_key_value(preferred_key) {
            if ModelUsage::matches_shape(value) {
                return Some(key.as_str());
            }
        }

        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != START_OF_MONTH_KEY)
            .find(|(_, value)| ModelUsage::matches_shape(value))
            .map(|(key, _)| key.as_str())
    }

    /// Model usage for the preferred (or first matching) model
    pub fn model_usage(&self, preferred_key: &str) -> Option<ModelUsage> {
        let key = self.find_model_key(preferred_key)?;
        let value = self.entries.get(key)?;

        match serde_json::from_value(value.clone()) {
            Ok(usage) => Some(usage),
            Err(e) => {
                tracing::debug!(key, error = %e, "Model entry has usage shape but failed to deserialize");
                None
            }
        }
    }
}

/// On-demand block of the summary response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDemandSummary {
    #[serde(default)]
    pub enabled: bool,
    /// Cents used
    #[serde(default)]
    pub used: f64,
    /// Cents limit (null when no limit is configured)
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub remaining: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualUsage {
    #[serde(default)]
    pub on_demand: OnDemandSummary,
}

/// Response of the usage summary endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummaryResponse {
    #[serde(default)]
    pub billing_cycle_start: Option<String>,
    pub billing_cycle_end: String,
    #[serde(default)]
    pub membership_type: Option<String>,
    #[serde(default)]
    pub is_unlimited: bool,
    #[serde(default)]
    pub individual_usage: IndividualUsage,
}

/// Both API responses fetched for one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedUsage {
    pub usage: UsageResponse,
    pub summary: UsageSummaryResponse,
}

impl CombinedUsage {
    /// Convert raw responses into an immutable snapshot
    pub fn to_snapshot(&self, preferred_model_key: &str) -> Result<UsageSnapshot, CoreError> {
        let included_requests = self
            .usage
            .model_usage(preferred_model_key)
            .map(|m| IncludedRequests::new(m.num_requests, m.max_request_usage));

        let on_demand = &self.summary.individual_usage.on_demand;
        let on_demand = OnDemandUsage::new(
            cents(on_demand.used),
            on_demand.limit.map(cents).unwrap_or(0),
            on_demand.enabled,
        );

        let billing_cycle_end = parse_timestamp(&self.summary.billing_cycle_end)?;

        Ok(UsageSnapshot::new(
            included_requests,
            on_demand,
            billing_cycle_end,
        ))
    }
}

fn cents(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| CoreError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn combined(usage: Value, on_demand: Value) -> CombinedUsage {
        serde_json::from_value(json!({
            "usage": usage,
            "summary": {
                "billingCycleStart": "2026-01-01T00:00:00Z",
                "billingCycleEnd": "2026-02-01T00:00:00Z",
                "membershipType": "pro",
                "isUnlimited": false,
                "individualUsage": { "onDemand": on_demand }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_matches_shape() {
        assert!(ModelUsage::matches_shape(
            &json!({"numRequestsTotal": 10, "maxRequestUsage": 100})
        ));
        assert!(ModelUsage::matches_shape(
            &json!({"numRequestsTotal": 10, "maxRequestUsage": null})
        ));
        assert!(!ModelUsage::matches_shape(&json!({"foo": "bar"})));
        assert!(!ModelUsage::matches_shape(&json!({"numRequestsTotal": 10})));
        assert!(!ModelUsage::matches_shape(&json!("2026-01-01T00:00:00Z")));
    }

    #[test]
    fn test_preferred_model_key() {
        let data = combined(
            json!({
                "startOfMonth": "2026-01-01T00:00:00Z",
                "claude-4": {"numRequests": 1, "numRequestsTotal": 1, "maxRequestUsage": 10},
                "gpt-4": {"numRequests": 42, "numRequestsTotal": 42, "maxRequestUsage": 500}
            }),
            json!({"enabled": true, "used": 250, "limit": 1000}),
        );
        assert_eq!(data.usage.find_model_key("gpt-4"), Some("gpt-4"));

        let snapshot = data.to_snapshot("gpt-4").unwrap();
        assert_eq!(
            snapshot.included_requests,
            Some(IncludedRequests::new(42, Some(500)))
        );
        assert_eq!(snapshot.on_demand, OnDemandUsage::new(250, 1000, true));
        assert_eq!(
            snapshot.billing_cycle_end,
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_fallback_model_key() {
        let data = combined(
            json!({
                "startOfMonth": "2026-01-01T00:00:00Z",
                "gpt-4-turbo": {"numRequests": 7, "numRequestsTotal": 7, "maxRequestUsage": null}
            }),
            json!({"enabled": false, "used": 0, "limit": 0}),
        );
        assert_eq!(data.usage.find_model_key("gpt-4"), Some("gpt-4-turbo"));

        let snapshot = data.to_snapshot("gpt-4").unwrap();
        assert_eq!(snapshot.included_requests, Some(IncludedRequests::new(7, None)));
        assert!(!snapshot.on_demand.enabled);
    }

    #[test]
    fn test_no_model_entry() {
        let data = combined(
            json!({"startOfMonth": "2026-01-01T00:00:00Z"}),
            json!({"enabled": true, "used": 10, "limit": null}),
        );
        let snapshot = data.to_snapshot("gpt-4").unwrap();
        assert!(snapshot.included_requests.is_none());
        assert_eq!(snapshot.on_demand.limit_cents, 0);
    }

    #[test]
    fn test_invalid_billing_cycle_end() {
        let mut data = combined(json!({}), json!({}));
        data.summary.billing_cycle_end = "next tuesday".to_string();
        let err = data.to_snapshot("gpt-4").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimestamp { .. }));
    }
}
