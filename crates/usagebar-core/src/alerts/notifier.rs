//! Notifier collaborator and selection continuations
//!
//! The engine never waits for the user to pick a toast action. It issues the
//! notification and attaches a continuation that runs when a selection
//! arrives.

use crate::severity::Severity;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Usage dashboard opened by the `Open Dashboard` action
pub const DASHBOARD_URL: &str = "https://cursor.com/dashboard?tab=usage";

/// Buttons offered on every usage notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationAction {
    Refresh,
    OpenDashboard,
}

impl NotificationAction {
    pub const ALL: [NotificationAction; 2] =
        [NotificationAction::Refresh, NotificationAction::OpenDashboard];

    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::Refresh => "Refresh",
            NotificationAction::OpenDashboard => "Open Dashboard",
        }
    }
}

/// Pending user selection; resolves to None when dismissed
pub type Selection = oneshot::Receiver<Option<NotificationAction>>;

/// Invoked when the user asks for a refresh from a notification
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Host toast API
pub trait Notifier: Send + Sync {
    /// Present a notification; the returned receiver resolves with the selection
    fn notify(&self, message: &str, severity: Severity) -> Selection;

    /// Open a URL in the host's browser
    fn open_external(&self, url: &str);
}

/// Apply a notification selection
pub fn handle_selection(
    selection: Option<NotificationAction>,
    notifier: &dyn Notifier,
    on_refresh: &RefreshCallback,
) {
    match selection {
        Some(NotificationAction::Refresh) => on_refresh(),
        Some(NotificationAction::OpenDashboard) => notifier.open_external(DASHBOARD_URL),
        None => {}
    }
}

/// Show a notification without blocking on the user's selection
///
/// Inside a tokio runtime the continuation runs as a detached task. Outside
/// one, only an already-available selection is handled.
pub fn dispatch(
    notifier: &Arc<dyn Notifier>,
    message: &str,
    severity: Severity,
    on_refresh: &RefreshCallback,
) {
    let mut selection = notifier.notify(message, severity);

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let notifier = Arc::clone(notifier);
            let on_refresh = Arc::clone(on_refresh);
            handle.spawn(async move {
                if let Ok(choice) = selection.await {
                    handle_selection(choice, notifier.as_ref(), &on_refresh);
                }
            });
        }
        Err(_) => match selection.try_recv() {
            Ok(choice) => handle_selection(choice, notifier.as_ref(), &on_refresh),
            Err(_) => debug!("No runtime available, notification selection dropped"),
        },
    }
}

/// A notification shown through [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Notifier that records every notification and answers with a scripted action
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    history: Mutex<Vec<NotificationRecord>>,
    opened_urls: Mutex<Vec<String>>,
    response: Option<NotificationAction>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every notification with `action`
    pub fn with_response(action: NotificationAction) -> Self {
        Self {
            response: Some(action),
            ..Self::default()
        }
    }

    pub fn history(&self) -> Vec<NotificationRecord> {
        self.history.lock().clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, severity: Severity) -> Selection {
        self.history.lock().push(NotificationRecord {
            message: message.to_string(),
            severity,
            timestamp: Utc::now(),
        });

        let (tx, rx) = oneshot::channel();
        let _ = tx.send(self.response);
        rx
    }

    fn open_external(&self, url: &str) {
        self.opened_urls.lock().push(url.to_string());
    }
}
