//! Severity classification for usage percentages
//!
//! Critical thresholds take precedence over warning thresholds. Threshold lists
//! may be empty or unsorted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a usage reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Below every threshold (no color)
    #[default]
    Normal,
    /// At or above a warning threshold (yellow)
    Warning,
    /// At or above a critical threshold (red)
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Normal => "ℹ",
            Severity::Warning => "⚠",
            Severity::Critical => "✗",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a percentage against warning and critical thresholds
///
/// # Examples
/// ```
/// use usagebar_core::severity::{classify, Severity};
///
/// assert_eq!(classify(40.0, &[50.0], &[80.0]), Severity::Normal);
/// assert_eq!(classify(60.0, &[50.0], &[80.0]), Severity::Warning);
/// assert_eq!(classify(90.0, &[50.0], &[80.0]), Severity::Critical);
/// ```
pub fn classify(percent: f64, warning_thresholds: &[f64], critical_thresholds: &[f64]) -> Severity {
    if critical_thresholds.iter().any(|&t| percent >= t) {
        return Severity::Critical;
    }

    if warning_thresholds.iter().any(|&t| percent >= t) {
        return Severity::Warning;
    }

    Severity::Normal
}
