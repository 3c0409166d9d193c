//! Settings file watcher
//!
//! Watches the directory holding the settings file and pushes a reconfigure
//! command to the poll driver when the effective configuration changes.

use crate::models::config::Config;
use crate::poller::PollHandle;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

/// Configuration for the settings watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet period after the last change before settings are reloaded
    pub debounce_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(300),
        }
    }
}

/// Reloads settings on change and forwards them to the driver
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    shutdown_tx: mpsc::Sender<()>,
}

impl ConfigWatcher {
    /// Start watching `settings_path`
    ///
    /// The parent directory must exist; the file itself may be created later.
    pub fn start(
        settings_path: PathBuf,
        initial: Config,
        handle: PollHandle,
        config: WatcherConfig,
    ) -> Result<Self, notify::Error> {
        let (event_tx, mut event_rx) = mpsc::channel::<notify::Result<Event>>(100);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            notify::Config::default(),
        )?;

        let dir = settings_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %settings_path.display(), "Settings watcher started");

        tokio::spawn(async move {
            let mut current = initial;

            loop {
                tokio::select! {
                    Some(result) = event_rx.recv() => {
                        match result {
                            Ok(event) if is_settings_change(&event, &settings_path) => {
                                tokio::time::sleep(config.debounce_delay).await;
                                while event_rx.try_recv().is_ok() {}

                                let reloaded = Config::load(&settings_path);
                                if reloaded == current {
                                    trace!("Settings unchanged after file event");
                                    continue;
                                }
                                debug!("Settings changed, reconfiguring");
                                current = reloaded.clone();
                                if !handle.reconfigure(reloaded) {
                                    break;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => error!(error = %e, "Settings watcher error"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Settings watcher shutting down");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            shutdown_tx,
        })
    }

    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Whether a notify event touches the settings file
fn is_settings_change(event: &Event, settings_path: &Path) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        _ => return false,
    }

    let file_name = settings_path.file_name();
    event
        .paths
        .iter()
        .any(|p| p == settings_path || (p.file_name().is_some() && p.file_name() == file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_modify_detected() {
        let settings = PathBuf::from("/home/user/.config/usagebar/settings.json");
        let modify = || {
            EventKind::Modify(notify::event::ModifyKind::Data(
                notify::event::DataChange::Content,
            ))
        };

        assert!(is_settings_change(
            &event(modify(), "/home/user/.config/usagebar/settings.json"),
            &settings
        ));
        assert!(!is_settings_change(
            &event(modify(), "/home/user/.config/usagebar/other.json"),
            &settings
        ));
    }

    #[test]
    fn test_access_events_ignored() {
        let settings = PathBuf::from("/tmp/settings.json");
        let access = EventKind::Access(notify::event::AccessKind::Read);
        assert!(!is_settings_change(&event(access, "/tmp/settings.json"), &settings));
    }

    #[test]
    fn test_remove_counts_as_change() {
        let settings = PathBuf::from("/tmp/settings.json");
        let remove = EventKind::Remove(notify::event::RemoveKind::File);
        assert!(is_settings_change(&event(remove, "/tmp/settings.json"), &settings));
    }
}
