//! Storefront CLI - a terminal front end for the storefront session layer.
//!
//! Logs in and out, shows the current session, browses products and opens
//! navigation destinations through the route guard. The session persists
//! between runs.

mod commands;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use storefront_core::config::Config;
use storefront_core::notify::NotificationLog;
use storefront_core::Storefront;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Log file name inside the cache directory
const LOG_FILE: &str = "storefront.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file when dropped.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.cache_dir() {
        Ok(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn usage() -> &'static str {
    "Usage: storefront <command>

Commands:
  login [username]          Log in (password from STOREFRONT_PASSWORD or prompt)
  logout                    Clear the saved session
  status                    Show the current session
  whoami                    Ask the server who the saved token belongs to
  register <username> [email]
  products [page] [keyword] List products
  product <id>...           Show product details
  open <path>               Navigate to a page, logging in first if required"
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let _guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Some(command) => command,
        None => {
            eprintln!("{}", usage());
            std::process::exit(2);
        }
    };

    let notifications = Arc::new(NotificationLog::new());
    let shop = Storefront::open(&config, notifications.clone())?;
    info!(?command, logged_in = shop.session.is_logged_in(), "Storefront CLI starting");

    let result = commands::run(command, &shop, &mut config).await;

    for notification in notifications.drain() {
        eprintln!("{}", notification);
    }

    result
}
