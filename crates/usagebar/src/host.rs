//! Terminal host: status line on stderr, notifications on stdout
//!
//! Keys read from stdin answer the latest notification or drive the poller:
//! `r` refresh, `o` open dashboard, `d` details, `t` tooltip, `q` quit,
//! empty line dismisses.

use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::{style, Print, Stylize},
    terminal::{Clear, ClearType},
};
use parking_lot::Mutex;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};
use usagebar_core::alerts::{Selection, DASHBOARD_URL};
use usagebar_core::{CapabilityPrompt, DisplaySurface, NotificationAction, Notifier, PollHandle, Severity};

/// Color `text` for a severity; normal stays plain
pub fn styled(text: &str, severity: Severity) -> String {
    match severity {
        Severity::Normal => text.to_string(),
        Severity::Warning => style(text).black().on_yellow().to_string(),
        Severity::Critical => style(text).white().on_red().to_string(),
    }
}

#[derive(Debug, Default)]
pub struct DisplayState {
    text: String,
    tooltip: String,
    severity: Severity,
    error: bool,
    last_printed: String,
}

impl DisplayState {
    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }
}

/// Status item redrawn in place on stderr
pub struct TerminalDisplay {
    state: Arc<Mutex<DisplayState>>,
    no_color: bool,
}

impl TerminalDisplay {
    pub fn new(no_color: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState::default())),
            no_color,
        }
    }

    pub fn state(&self) -> Arc<Mutex<DisplayState>> {
        Arc::clone(&self.state)
    }

    fn redraw(&self) {
        let mut state = self.state.lock();
        let severity = if state.error {
            Severity::Critical
        } else {
            state.severity
        };

        if self.no_color {
            // One line per change keeps log output readable
            if state.text != state.last_printed {
                eprintln!("[{}] {}", severity, state.text);
                state.last_printed = state.text.clone();
            }
            return;
        }

        let line = styled(&format!(" {} ", state.text), severity);
        if let Err(e) = execute!(
            std::io::stderr(),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        ) {
            warn!(error = %e, "Failed to redraw status line");
        }
    }
}

impl DisplaySurface for TerminalDisplay {
    fn set_text(&mut self, text: &str) {
        self.state.lock().text = text.to_string();
        self.redraw();
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        self.state.lock().tooltip = tooltip.to_string();
    }

    fn set_color(&mut self, severity: Severity) {
        {
            let mut state = self.state.lock();
            state.severity = severity;
            state.error = false;
        }
        self.redraw();
    }

    fn set_error(&mut self, _message: &str) {
        self.state.lock().error = true;
        self.redraw();
    }
}

type PendingSelection = oneshot::Sender<Option<NotificationAction>>;

/// Prints notifications and waits for a key to pick an action
///
/// A new notification dismisses the previous unanswered one.
pub struct TerminalNotifier {
    pending: Mutex<Option<PendingSelection>>,
    no_color: bool,
}

impl TerminalNotifier {
    pub fn new(no_color: bool) -> Self {
        Self {
            pending: Mutex::new(None),
            no_color,
        }
    }

    /// Answer the pending notification; false when none is waiting
    pub fn answer(&self, action: Option<NotificationAction>) -> bool {
        match self.pending.lock().take() {
            Some(tx) => tx.send(action).is_ok(),
            None => false,
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str, severity: Severity) -> Selection {
        info!(severity = %severity, message, "Notification");

        let actions: Vec<String> = NotificationAction::ALL
            .iter()
            .map(|a| format!("[{}] {}", key_for(*a), a.label()))
            .collect();

        let headline = format!("{} {message}", severity.icon());
        if self.no_color {
            println!("{headline}  {}", actions.join("  "));
        } else {
            println!("\n{}  {}", styled(&headline, severity), actions.join("  "));
        }

        let (tx, rx) = oneshot::channel();
        *self.pending.lock() = Some(tx);
        rx
    }

    fn open_external(&self, url: &str) {
        if let Err(e) = open::that(url) {
            warn!(url, error = %e, "Failed to open browser");
            println!("Open {url} in your browser");
        }
    }
}

fn key_for(action: NotificationAction) -> char {
    match action {
        NotificationAction::Refresh => 'r',
        NotificationAction::OpenDashboard => 'o',
    }
}

/// Shown once when activation fails
pub struct TerminalPrompt;

impl CapabilityPrompt for TerminalPrompt {
    fn prompt(&self, capability: &str, hint: &str) {
        eprintln!("✗ Missing {capability}");
        eprintln!("  {hint}");
    }
}

/// Read keys from stdin on a plain thread until `q` or end of input
pub fn spawn_input_loop(
    handle: PollHandle,
    notifier: Arc<TerminalNotifier>,
    display: Arc<Mutex<DisplayState>>,
) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };

            match line.trim() {
                "r" => {
                    if !notifier.answer(Some(NotificationAction::Refresh)) {
                        handle.refresh();
                    }
                }
                "o" => {
                    if !notifier.answer(Some(NotificationAction::OpenDashboard)) {
                        notifier.open_external(DASHBOARD_URL);
                    }
                }
                "d" => {
                    handle.show_details();
                }
                "t" => println!("\n{}", display.lock().tooltip()),
                "q" => {
                    handle.shutdown();
                    break;
                }
                "" => {
                    notifier.answer(None);
                }
                other => println!("Unknown key '{other}' (r, o, d, t, q)"),
            }
        }
    });
}
