//! usagebar - usage threshold alerts and status line

mod host;
mod source;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use host::{spawn_input_loop, styled, TerminalDisplay, TerminalNotifier, TerminalPrompt};
use source::CliSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use usagebar_core::alerts::usage_summary;
use usagebar_core::{
    activate, CapabilityPrompt, Config, ConfigWatcher, CoreError, DisplaySurface, Notifier,
    RecordingNotifier, SnapshotSource, StatusComposer, UsageSnapshot, WatcherConfig,
};

#[derive(Parser)]
#[command(
    name = "usagebar",
    version,
    about = "Usage threshold alerts and status line",
    long_about = "Polls the Cursor usage API and reports request and on-demand usage against\n\
                  configurable percentage thresholds.\n\
                  \n\
                  Each threshold alerts once per billing cycle. Thresholds already exceeded at\n\
                  startup are marked silently.\n\
                  \n\
                  Examples:\n\
                    usagebar watch                   # Poll the live API\n\
                    usagebar watch --file usage.json # Poll a saved usage document\n\
                    usagebar status --json           # One-shot status as JSON\n\
                    usagebar details                 # One-line usage summary\n\
                    usagebar config init             # Write default settings\n\
                  \n\
                  Environment Variables:\n\
                    USAGEBAR_CONFIG                  # Settings file path\n\
                    USAGEBAR_ACCESS_TOKEN            # Access token (skips the editor database)\n\
                    USAGEBAR_NO_COLOR                # Disable ANSI colors (log-friendly)\n\
                    RUST_LOG                         # Log filter, e.g. usagebar_core=debug"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (default: <config dir>/usagebar/settings.json)
    #[arg(long, global = true, env = "USAGEBAR_CONFIG")]
    config: Option<PathBuf>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, global = true, env = "USAGEBAR_NO_COLOR")]
    no_color: bool,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Poll continuously and show alerts
    Watch {
        /// Read usage from a saved JSON document instead of the API
        #[arg(long)]
        file: Option<PathBuf>,
        /// Record notifications instead of prompting, print them on exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch once and print the status line and tooltip
    Status {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch once and print the usage summary
    Details {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Write default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the settings path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.no_color);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let no_color = cli.no_color;

    match cli.command {
        Command::Watch { file, dry_run } => {
            run_watch(&config_path, file, dry_run, no_color).await?;
        }
        Command::Status { file, json } => {
            run_status(&config_path, file, json, no_color).await?;
        }
        Command::Details { file } => {
            run_details(&config_path, file).await?;
        }
        Command::Config { action } => {
            run_config(&config_path, action)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool, no_color: bool) {
    let default = if verbose {
        "usagebar=debug,usagebar_core=debug"
    } else {
        "usagebar=warn,usagebar_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(!no_color)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run_watch(
    config_path: &Path,
    file: Option<PathBuf>,
    dry_run: bool,
    no_color: bool,
) -> Result<()> {
    let config = Config::load(config_path);
    let source = CliSource::from_args(file);

    let terminal = Arc::new(TerminalNotifier::new(no_color));
    let recorder = dry_run.then(|| Arc::new(RecordingNotifier::new()));
    let notifier: Arc<dyn Notifier> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => terminal.clone(),
    };

    let display = TerminalDisplay::new(no_color);
    let display_state = display.state();

    let driver = activate(source, config.clone(), notifier, &TerminalPrompt, move || {
        Box::new(display) as Box<dyn DisplaySurface>
    })
    .context("Failed to start usage monitor")?;
    let handle = driver.handle();

    let watcher = match ConfigWatcher::start(
        config_path.to_path_buf(),
        config,
        handle.clone(),
        WatcherConfig::default(),
    ) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Settings changes will not be picked up");
            None
        }
    };

    if recorder.is_none() {
        spawn_input_loop(handle.clone(), Arc::clone(&terminal), display_state);
    }

    let mut task = tokio::spawn(driver.run());
    tokio::select! {
        result = &mut task => {
            result.context("Poll task failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            handle.shutdown();
            task.await.context("Poll task failed")?;
        }
    }

    if let Some(watcher) = watcher {
        watcher.stop().await;
    }
    eprintln!();

    if let Some(recorder) = recorder {
        let history = recorder.history();
        println!("{} notification(s):", history.len());
        for record in history {
            println!(
                "  {} {} {}",
                record.timestamp.format("%H:%M:%S"),
                record.severity.icon(),
                record.message
            );
        }
    }

    Ok(())
}

/// Check the source and fetch a single snapshot
async fn fetch_once(config: &Config, file: Option<PathBuf>) -> Result<UsageSnapshot> {
    let source = CliSource::from_args(file);

    if let Err(e) = source.check_capability() {
        if let CoreError::MissingCapability { capability, hint } = &e {
            TerminalPrompt.prompt(capability, hint);
        }
        return Err(e.into());
    }

    source
        .fetch(&config.api.included_request_model_key)
        .await
        .map_err(|e| anyhow::anyhow!(e.display_message()))
        .context("Failed to fetch usage")
}

async fn run_status(
    config_path: &Path,
    file: Option<PathBuf>,
    json: bool,
    no_color: bool,
) -> Result<()> {
    let config = Config::load(config_path);
    let snapshot = fetch_once(&config, file).await?;
    let view = StatusComposer::new().render(&snapshot, &config);

    if json {
        let output = serde_json::json!({
            "text": view.text,
            "tooltip": view.tooltip,
            "severity": view.color,
            "snapshot": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let text = if no_color {
        view.text.clone()
    } else {
        styled(&view.text, view.color)
    };
    println!("{text}  ({})", view.color);
    println!();
    println!("{}", view.tooltip);

    Ok(())
}

async fn run_details(config_path: &Path, file: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path);
    let snapshot = fetch_once(&config, file).await?;
    println!("{}", usage_summary(&snapshot));
    Ok(())
}

fn run_config(config_path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(config_path);
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "Settings already exist at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(config_path)?;
            println!("Wrote default settings to {}", config_path.display());
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_with_file() {
        let cli = Cli::try_parse_from(["usagebar", "watch", "--file", "usage.json", "--no-color"])
            .unwrap();
        assert!(cli.no_color);
        match cli.command {
            Command::Watch { file, dry_run } => {
                assert_eq!(file, Some(PathBuf::from("usage.json")));
                assert!(!dry_run);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        run_config(&path, ConfigAction::Init { force: false }).unwrap();
        assert!(path.exists());
        assert!(run_config(&path, ConfigAction::Init { force: false }).is_err());
        run_config(&path, ConfigAction::Init { force: true }).unwrap();
        assert_eq!(Config::load(&path), Config::default());
    }
}
