//! Threshold alerts: per-metric tracking, the alert engine and the notifier seam

pub mod engine;
pub mod notifier;
pub mod tracker;

pub use engine::{usage_summary, AlertEngine, FiredAlert};
pub use notifier::{
    dispatch, NotificationAction, NotificationRecord, Notifier, RecordingNotifier,
    RefreshCallback, Selection, DASHBOARD_URL,
};
pub use tracker::{Crossing, TriggeredThresholds};
