//! Periscope - a rewriting content proxy.
//!
//! Runs the proxy server that fetches pages on the client's behalf,
//! rewrites HTML and CSS so embedded references route back through the
//! proxy, and streams everything else through untouched.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use periscope_server::{Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Periscope - rewriting content proxy
#[derive(Parser, Debug)]
#[command(name = "periscope", version, about)]
struct Args {
    /// Host to bind the proxy to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind the proxy to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// User-Agent sent upstream when the client provides none
    #[arg(long)]
    user_agent: Option<String>,

    /// Timeout in seconds for upstream fetches (no timeout if unset)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory for log files (defaults to the platform data directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir(args: &Args) -> Option<PathBuf> {
    if let Some(dir) = &args.log_dir {
        return Some(dir.clone());
    }
    ProjectDirs::from("", "periscope", "Periscope").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("periscope={},warn", log_level)));

    // Try to set up file logging
    if let Some(log_dir) = logs_dir(args) {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("periscope")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (keep guard alive for the duration of the program)
    let _log_guard = init_logging(&args);

    tracing::info!("Starting Periscope {}...", env!("CARGO_PKG_VERSION"));

    let mut config = ServerConfig::default()
        .with_host(args.host.as_str())
        .with_port(args.port);
    if let Some(user_agent) = &args.user_agent {
        config = config.with_user_agent(user_agent.as_str());
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let server = Server::new(config)?;
    tracing::info!("Browse via http://{}/", server.addr());

    server.run().await?;

    tracing::info!("Periscope shutting down");
    Ok(())
}
