//! Shopkeep - command-line shell for the shop admin session.
//!
//! Signs an administrator in against the shop backend, keeps the access
//! token fresh and makes authenticated requests with it.

mod app;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use shopkeep_core::Config;

const USAGE: &str = "\
Usage: shopkeep <command> [args]

Commands:
  login [email]            Sign in (administrators only)
  logout                   Sign out and forget stored tokens
  status                   Show the current session (default)
  token                    Print a valid access token, renewing it if needed
  get <path>               GET a backend path with the session token
  forgot-password [email]  Request a password reset email
  watch                    Keep the session alive until it ends or Ctrl-C

Environment:
  SHOPKEEP_API_URL         Backend base URL (overrides config)
  SHOPKEEP_EMAIL           Login email
  SHOPKEEP_PASSWORD        Login password
  RUST_LOG                 Log filter, e.g. RUST_LOG=shopkeep_core=debug";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and, when a log directory is available, to a daily
/// rolling file. The returned guard must live until exit so the file writer
/// flushes.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let appender = tracing_appender::rolling::daily(dir, "shopkeep.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
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

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");
    let arg = args.get(2).cloned();

    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load();
    let log_dir = config.as_ref().ok().and_then(|c| c.cache_dir().ok());
    let _log_guard = init_tracing(log_dir);

    let config = config.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    info!(command, "Shopkeep starting");
    let mut app = App::new(config).await?;

    match command {
        "login" => app.login_interactive(arg).await?,
        "logout" => app.logout().await,
        "status" => app.status().await?,
        "token" => app.print_token().await?,
        "get" => match arg {
            Some(path) => app.get(&path).await?,
            None => bail!("Usage: shopkeep get <path>"),
        },
        "forgot-password" => app.forgot_password(arg).await?,
        "watch" => app.watch().await?,
        other => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", other);
        }
    }

    Ok(())
}
