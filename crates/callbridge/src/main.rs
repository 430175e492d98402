// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callbridge - FreePBX call events to amoCRM.
//!
//! This is the binary entry point.

mod auth;
mod serve;
mod shutdown;

use std::path::{Path, PathBuf};

use callbridge_config::{CallbridgeConfig, ConfigError};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Callbridge - FreePBX call events to amoCRM.
#[derive(Parser, Debug)]
#[command(name = "callbridge", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bridge: AMI listener, CRM sync and HTTP gateway.
    Serve,
    /// Print the CRM authorization URL.
    AuthUrl,
    /// Exchange an authorization code for tokens and store them.
    ExchangeCode {
        /// The `code` query parameter from the CRM redirect.
        code: String,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            callbridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            // Dropping the guard flushes buffered log lines, so it lives until exit.
            let _log_guard =
                init_tracing(&config.service.log_level, config.service.log_file.as_deref());
            serve::run_serve(config).await
        }
        Some(Commands::AuthUrl) => auth::run_auth_url(&config),
        Some(Commands::ExchangeCode { code }) => {
            let _log_guard = init_tracing(&config.service.log_level, None);
            auth::run_exchange_code(&config, &code).await
        }
        Some(Commands::CheckConfig) => {
            println!("callbridge: configuration is valid");
            Ok(())
        }
        None => {
            println!("callbridge: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("callbridge: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<CallbridgeConfig, Vec<ConfigError>> {
    match path {
        Some(path) => callbridge_config::load_and_validate_path(path),
        None => callbridge_config::load_and_validate(),
    }
}

/// Initializes the tracing subscriber, optionally mirroring output to `log_file`.
///
/// File output goes through a background writer; the returned guard must be
/// held for as long as logs should be flushed.
fn init_tracing(log_level: &str, log_file: Option<&str>) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("callbridge={log_level},warn")));

    let (file_writer, guard) = match log_file.map(file_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("callbridge: {e}; logging to stderr only");
            (None, None)
        }
        None => (None, None),
    };
    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

/// Opens `path` for appending, without rotation.
fn file_appender(path: &str) -> Result<RollingFileAppender, String> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("log file {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| format!("cannot open log file {}: {e}", path.display()))
}
