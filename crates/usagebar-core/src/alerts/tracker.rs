//! Per-metric record of thresholds that already fired
//!
//! Thresholds never re-arm when usage drops below them; only `reset` clears
//! the record.

use crate::models::config::ThresholdSet;
use crate::severity::Severity;

/// A threshold value tagged with the list it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub value: f64,
    pub severity: Severity,
}

/// Set of threshold values that already produced an alert
#[derive(Debug, Clone, Default)]
pub struct TriggeredThresholds {
    values: Vec<f64>,
}

impl TriggeredThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.values.contains(&value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Triggered values in ascending order
    pub fn values(&self) -> Vec<f64> {
        let mut values = self.values.clone();
        values.sort_by(f64::total_cmp);
        values
    }

    /// Mark a value as triggered (idempotent)
    pub fn mark(&mut self, value: f64) {
        if !self.contains(value) {
            self.values.push(value);
        }
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Pick the highest newly crossed threshold and mark everything at or below it
    ///
    /// Returns at most one crossing per call, no matter how many thresholds the
    /// percentage jumped over since the last check.
    pub fn check_and_fire(&mut self, percent: f64, thresholds: &ThresholdSet) -> Option<Crossing> {
        let crossed: Vec<Crossing> = candidates(thresholds)
            .filter(|c| percent >= c.value)
            .collect();

        // max_by keeps the last of equal values, so a value present in both
        // lists fires as critical.
        let selected = crossed
            .iter()
            .filter(|c| !self.contains(c.value))
            .copied()
            .max_by(|a, b| a.value.total_cmp(&b.value))?;

        for c in crossed.iter().filter(|c| c.value <= selected.value) {
            self.mark(c.value);
        }

        Some(selected)
    }

    /// Mark every threshold at or below `percent` without selecting an alert
    pub fn mark_all_exceeded(&mut self, percent: f64, thresholds: &ThresholdSet) {
        for c in candidates(thresholds) {
            if percent >= c.value {
                self.mark(c.value);
            }
        }
    }
}

fn candidates(thresholds: &ThresholdSet) -> impl Iterator<Item = Crossing> + '_ {
    let warning = thresholds.warning.iter().map(|&value| Crossing {
        value,
        severity: Severity::Warning,
    });
    let critical = thresholds.critical.iter().map(|&value| Crossing {
        value,
        severity: Severity::Critical,
    });
    warning.chain(critical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_set() -> ThresholdSet {
        ThresholdSet::new(vec![50.0, 60.0, 70.0], vec![80.0, 90.0, 95.0])
    }

    #[test]
    fn test_nothing_crossed() {
        let mut triggered = TriggeredThresholds::new();
        assert!(triggered.check_and_fire(45.0, &default_set()).is_none());
        assert!(triggered.is_empty());
    }

    #[test]
    fn test_jump_fires_only_highest() {
        let mut triggered = TriggeredThresholds::new();
        let crossing = triggered.check_and_fire(85.0, &default_set()).unwrap();

        assert_eq!(crossing.value, 80.0);
        assert_eq!(crossing.severity, Severity::Critical);
        assert_eq!(triggered.values(), vec![50.0, 60.0, 70.0, 80.0]);
        assert!(!triggered.contains(90.0));
        assert!(!triggered.contains(95.0));
    }

    #[test]
    fn test_same_percent_fires_once() {
        let mut triggered = TriggeredThresholds::new();
        assert!(triggered.check_and_fire(62.0, &default_set()).is_some());
        assert!(triggered.check_and_fire(62.0, &default_set()).is_none());
        assert!(triggered.check_and_fire(55.0, &default_set()).is_none());
    }

    #[test]
    fn test_no_rearm_after_drop() {
        let mut triggered = TriggeredThresholds::new();
        assert!(triggered.check_and_fire(55.0, &default_set()).is_some());
        assert!(triggered.check_and_fire(10.0, &default_set()).is_none());
        assert!(triggered.check_and_fire(55.0, &default_set()).is_none());
    }

    #[test]
    fn test_unsorted_thresholds() {
        let set = ThresholdSet::new(vec![70.0, 50.0, 60.0], vec![95.0, 80.0, 90.0]);
        let mut triggered = TriggeredThresholds::new();
        let crossing = triggered.check_and_fire(72.0, &set).unwrap();
        assert_eq!(crossing.value, 70.0);
        assert_eq!(crossing.severity, Severity::Warning);
        assert_eq!(triggered.values(), vec![50.0, 60.0, 70.0]);
    }

    #[test]
    fn test_value_in_both_lists_fires_critical() {
        let set = ThresholdSet::new(vec![80.0], vec![80.0]);
        let mut triggered = TriggeredThresholds::new();
        let crossing = triggered.check_and_fire(80.0, &set).unwrap();
        assert_eq!(crossing.severity, Severity::Critical);
        assert_eq!(triggered.len(), 1);
    }

    #[test]
    fn test_mark_all_exceeded_matches_real_fires() {
        let mut marked = TriggeredThresholds::new();
        marked.mark_all_exceeded(92.0, &default_set());

        let mut fired = TriggeredThresholds::new();
        for percent in [50.0, 60.0, 70.0, 80.0, 92.0] {
            fired.check_and_fire(percent, &default_set());
        }

        assert_eq!(marked.values(), fired.values());
        assert_eq!(marked.values(), vec![50.0, 60.0, 70.0, 80.0, 90.0]);
    }

    #[test]
    fn test_reset_rearms() {
        let mut triggered = TriggeredThresholds::new();
        triggered.check_and_fire(75.0, &default_set());
        triggered.reset();
        assert!(triggered.is_empty());

        let crossing = triggered.check_and_fire(75.0, &default_set()).unwrap();
        assert_eq!(crossing.value, 70.0);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut triggered = TriggeredThresholds::new();
        triggered.mark(50.0);
        triggered.mark(50.0);
        assert_eq!(triggered.len(), 1);
    }
}
