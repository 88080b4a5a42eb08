// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! vibeide-host server and CLI.
//!
//! Without a subcommand the host serves channel requests on stdin/stdout for
//! the UI process. The other subcommands administer the settings document and
//! evaluate the security policy from a terminal.

#![allow(clippy::print_stdout, reason = "CLI tool needs to output to stdout")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use vibeide_host::bridge::{CHANNELS, IpcBridgeHandler, SecurityPolicy};
use vibeide_host::config::Config;
use vibeide_host::ipc::IpcServer;
use vibeide_host::logging::{LogSink, SinkLayer};
use vibeide_host::settings::{SettingValue, SettingsStore};
use vibeide_host::workspace::{FileService, ProjectService};

/// Command-line arguments for vibeide-host.
#[derive(Parser, Debug)]
#[command(name = "vibeide-host")]
#[command(about = "Privileged host process for the VibeIDE desktop shell")]
#[command(version = env!("VIBEIDE_VERSION"))]
struct Args {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding settings.json and logs/.
    /// Overrides the config file and VIBEIDE_DATA_DIR if set.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log file size in bytes that triggers rotation.
    #[arg(long, global = true)]
    log_max_bytes: Option<u64>,
}

/// Subcommands supported by vibeide-host.
#[derive(Subcommand, Debug)]
enum Command {
    /// Serve channel requests on stdin/stdout (default if no subcommand given).
    Serve,

    /// Read or change the persisted settings.
    Settings {
        /// The settings action.
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Report whether the security policy accepts a path.
    CheckPath {
        /// Path to evaluate.
        path: PathBuf,
    },
}

/// Settings administration actions.
#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the value stored under a dotted key.
    Get {
        /// Dotted key, e.g. editor.fontSize.
        key: String,
    },
    /// Store a value under a dotted key. The value is parsed as JSON and
    /// falls back to a plain string.
    Set {
        /// Dotted key, e.g. editor.fontSize.
        key: String,
        /// New value.
        value: String,
    },
    /// Restore every setting to its default.
    Reset,
    /// Print the whole settings document.
    Show,
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if the subcommand fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        None | Some(Command::Serve) => run_server(config).await,
        Some(Command::Settings { action }) => {
            init_cli_tracing(&config);
            run_settings(&config, action).await
        }
        Some(Command::CheckPath { path }) => {
            run_check_path(&path);
            Ok(())
        }
    }
}

/// Loads configuration and applies command-line overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone())?;

    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(bytes) = args.log_max_bytes {
        config.log_max_bytes = bytes;
    }

    Ok(config)
}

fn stderr_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

fn init_cli_tracing(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(stderr_filter(config))
        .with_writer(std::io::stderr)
        .init();
}

/// Runs the host server.
///
/// # Errors
///
/// Returns an error if the data directory cannot be resolved or the transport
/// fails.
async fn run_server(config: Config) -> Result<()> {
    let sink = LogSink::new(
        config.log_path()?,
        config.log_max_bytes,
        tokio::runtime::Handle::current(),
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(stderr_filter(&config)),
        )
        .with(
            SinkLayer::new(sink.clone())
                .with_filter(Targets::new().with_target("vibeide_host", Level::DEBUG)),
        )
        .init();

    info!("Starting vibeide-host {}", env!("VIBEIDE_VERSION"));
    info!("Data directory: {}", config.data_dir()?.display());
    info!("Log file: {}", sink.path().display());

    let policy = SecurityPolicy::new();
    let files = Arc::new(FileService::new(policy));
    let projects = Arc::new(ProjectService::new(policy));
    let settings = Arc::new(SettingsStore::new(
        config.settings_path()?,
        &config.environment(),
    ));

    let handler = IpcBridgeHandler::new(files, projects, settings, sink.clone());
    info!("Serving {} channels", CHANNELS.len());

    let result = IpcServer::new(Arc::new(handler)).run_stdio().await;

    if let Err(e) = &result {
        error!("Server stopped: {e:#}");
    }
    info!(log_cycles = sink.drain_cycles(), "vibeide-host shutting down");
    sink.flush().await;

    result
}

/// Runs a settings administration action.
async fn run_settings(config: &Config, action: SettingsAction) -> Result<()> {
    let store = SettingsStore::new(config.settings_path()?, &config.environment());

    match action {
        SettingsAction::Get { key } => match store.get(&key).await? {
            SettingValue::Defined(value) => {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            SettingValue::Undefined => println!("undefined"),
        },
        SettingsAction::Set { key, value } => {
            let value = match serde_json::from_str(&value) {
                Ok(parsed) => parsed,
                Err(_) => serde_json::Value::String(value),
            };
            store
                .set(&key, value)
                .await
                .with_context(|| format!("Failed to set {key}"))?;
            println!("Set {key}");
        }
        SettingsAction::Reset => {
            store.reset().await.context("Failed to reset settings")?;
            println!("Settings reset to defaults");
        }
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&store.snapshot().await)?);
        }
    }

    Ok(())
}

/// Evaluates the path rule for `path`.
fn run_check_path(path: &std::path::Path) {
    let policy = SecurityPolicy::new();
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    if policy.is_path_safe(path) && policy.is_path_safe(&absolute) {
        println!("allowed: {}", absolute.display());
    } else {
        println!("denied: {}", absolute.display());
    }
}
