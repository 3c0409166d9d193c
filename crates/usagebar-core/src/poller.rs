//! Poll driver
//!
//! A single task owns the alert engine, the status composer and the display.
//! Ticks and commands are handled one at a time, so fetches never overlap and
//! tracker updates are applied in order.

use crate::alerts::engine::{AlertEngine, FiredAlert};
use crate::alerts::notifier::{Notifier, RefreshCallback};
use crate::error::CoreError;
use crate::models::config::Config;
use crate::models::usage::UsageSnapshot;
use crate::source::SnapshotSource;
use crate::status::{DisplaySurface, StatusComposer};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Driver lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Loading,
    Displaying,
    Error(String),
}

/// Commands accepted by a running driver
#[derive(Debug, Clone)]
pub enum PollCommand {
    /// Fetch now and restart the interval
    Refresh,
    /// Fetch and show the usage summary notification
    ShowDetails,
    /// Apply new settings, restart the interval and fetch
    Reconfigure(Box<Config>),
    Shutdown,
}

/// Cloneable sender for driver commands
#[derive(Debug, Clone)]
pub struct PollHandle {
    tx: mpsc::UnboundedSender<PollCommand>,
}

impl PollHandle {
    fn send(&self, command: PollCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn refresh(&self) -> bool {
        self.send(PollCommand::Refresh)
    }

    pub fn show_details(&self) -> bool {
        self.send(PollCommand::ShowDetails)
    }

    pub fn reconfigure(&self, config: Config) -> bool {
        self.send(PollCommand::Reconfigure(Box::new(config)))
    }

    pub fn shutdown(&self) -> bool {
        self.send(PollCommand::Shutdown)
    }

    /// Callback for the notification `Refresh` action
    pub fn refresh_callback(&self) -> RefreshCallback {
        let handle = self.clone();
        Arc::new(move || {
            handle.refresh();
        })
    }

    /// Callback for the summary notification: refresh, then reopen the summary
    fn details_callback(&self) -> RefreshCallback {
        let handle = self.clone();
        Arc::new(move || {
            handle.refresh();
            handle.show_details();
        })
    }
}

/// Invoked once when activation fails for a missing capability
pub trait CapabilityPrompt: Send + Sync {
    fn prompt(&self, capability: &str, hint: &str);
}

pub struct PollDriver<S: SnapshotSource> {
    source: S,
    config: Config,
    engine: AlertEngine,
    composer: StatusComposer,
    display: Box<dyn DisplaySurface>,
    state: PollState,
    last_billing_cycle_end: Option<DateTime<Utc>>,
    first_load: bool,
    commands: mpsc::UnboundedReceiver<PollCommand>,
    handle: PollHandle,
}

impl<S: SnapshotSource> PollDriver<S> {
    pub fn new(
        source: S,
        config: Config,
        notifier: Arc<dyn Notifier>,
        display: Box<dyn DisplaySurface>,
    ) -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        Self {
            source,
            config,
            engine: AlertEngine::new(notifier),
            composer: StatusComposer::new(),
            display,
            state: PollState::Idle,
            last_billing_cycle_end: None,
            first_load: true,
            commands,
            handle: PollHandle { tx },
        }
    }

    pub fn handle(&self) -> PollHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Fetch once and update display and alerts
    ///
    /// Returns the alerts fired by this poll. On failure the display switches
    /// to the error state and tracker state is left untouched.
    pub async fn refresh(&mut self) -> Vec<FiredAlert> {
        self.state = PollState::Loading;
        self.composer.show_loading(self.display.as_mut());

        let model_key = self.config.api.included_request_model_key.clone();
        match self.source.fetch(&model_key).await {
            Ok(snapshot) => self.apply_snapshot(&snapshot),
            Err(e) => {
                let message = e.display_message();
                warn!(error = %message, "Usage fetch failed");
                self.composer.show_error(self.display.as_mut(), &message);
                self.state = PollState::Error(message);
                Vec::new()
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &UsageSnapshot) -> Vec<FiredAlert> {
        if let Some(previous) = self.last_billing_cycle_end {
            if previous != snapshot.billing_cycle_end {
                info!(
                    previous = %previous,
                    current = %snapshot.billing_cycle_end,
                    "Billing cycle rolled over, resetting thresholds"
                );
                self.engine.reset_all();
            }
        }
        self.last_billing_cycle_end = Some(snapshot.billing_cycle_end);

        self.composer
            .show(self.display.as_mut(), snapshot, &self.config);
        self.state = PollState::Displaying;

        if self.first_load {
            self.first_load = false;
            self.engine.mark_all_exceeded(snapshot, &self.config);
            if self.config.notify_on_startup {
                self.engine
                    .show_usage_summary(snapshot, &self.config, &self.handle.details_callback());
            }
            return Vec::new();
        }

        let fired = self
            .engine
            .check_all_thresholds(snapshot, &self.config, &self.handle.refresh_callback());
        debug!(alerts = fired.len(), "Usage refreshed");
        fired
    }

    /// Fetch and show the usage summary, without touching display or trackers
    pub async fn show_details(&mut self) -> Result<String, CoreError> {
        let snapshot = self
            .source
            .fetch(&self.config.api.included_request_model_key)
            .await?;
        Ok(self
            .engine
            .show_usage_summary(&snapshot, &self.config, &self.handle.details_callback()))
    }

    fn apply_config(&mut self, config: Config) {
        info!(
            interval_secs = config.poll_interval_seconds,
            "Configuration changed"
        );
        self.config = config;
    }

    fn new_interval(&self) -> Interval {
        let period = self.config.poll_interval();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Poll until a shutdown command arrives
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.poll_interval_seconds,
            "Poll started"
        );

        self.refresh().await;
        let mut ticker = self.new_interval();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                command = self.commands.recv() => match command {
                    Some(PollCommand::Refresh) => {
                        ticker = self.new_interval();
                        self.refresh().await;
                        debug!("Poll restarted");
                    }
                    Some(PollCommand::ShowDetails) => {
                        if let Err(e) = self.show_details().await {
                            error!(error = %e.display_message(), "Failed to fetch usage details");
                        }
                    }
                    Some(PollCommand::Reconfigure(config)) => {
                        self.apply_config(*config);
                        ticker = self.new_interval();
                        self.refresh().await;
                    }
                    Some(PollCommand::Shutdown) | None => break,
                },
            }
        }

        info!("Poll stopped");
    }
}

/// Check the source capability, then build the driver and its display
///
/// On a missing capability the prompt is invoked once and no display is
/// created.
pub fn activate<S, F>(
    source: S,
    config: Config,
    notifier: Arc<dyn Notifier>,
    prompt: &dyn CapabilityPrompt,
    make_display: F,
) -> Result<PollDriver<S>, CoreError>
where
    S: SnapshotSource,
    F: FnOnce() -> Box<dyn DisplaySurface>,
{
    if let Err(e) = source.check_capability() {
        if let CoreError::MissingCapability { capability, hint } = &e {
            warn!(capability = %capability, "Activation aborted");
            prompt.prompt(capability, hint);
        }
        return Err(e);
    }

    info!("Activating usage monitor");
    Ok(PollDriver::new(source, config, notifier, make_display()))
}
