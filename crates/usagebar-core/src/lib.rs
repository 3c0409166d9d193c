//! usagebar-core - usage threshold alerts for a status line
//!
//! Provides:
//! - Usage snapshot and API response models
//! - Settings loading with per-setting validation
//! - Severity classification and status line composition
//! - Threshold tracking with fire-once alerts per billing cycle
//! - A poll driver that ties a snapshot source to a display and a notifier
//! - A settings watcher that reconfigures the driver on change

pub mod alerts;
pub mod credentials;
pub mod error;
pub mod format;
pub mod models;
pub mod poller;
pub mod severity;
pub mod source;
pub mod status;
pub mod watcher;

pub use alerts::{AlertEngine, FiredAlert, NotificationAction, Notifier, RecordingNotifier};
pub use credentials::Credentials;
pub use error::CoreError;
pub use models::{
    CombinedUsage, Config, DisplayMode, IncludedRequests, Metric, OnDemandUsage, PrimaryMetric,
    ThresholdSet, UsageSnapshot,
};
pub use poller::{activate, CapabilityPrompt, PollCommand, PollDriver, PollHandle, PollState};
pub use severity::{classify, Severity};
pub use source::{FileSource, HttpSource, SnapshotSource};
pub use status::{DisplaySurface, MemoryDisplay, StatusComposer, StatusView};
pub use watcher::{ConfigWatcher, WatcherConfig};
