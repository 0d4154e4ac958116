//! Stenolink Daemon (stenod)
//!
//! The main server process for Stenolink - a realtime court-reporting
//! transcription feed server.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (feed on 5500, viewers on 5501)
//! stenod
//!
//! # Custom ports
//! stenod --feed-port 7000 --viewer-port 7001
//!
//! # A feed using the printable bracket delimiters
//! stenod --delimiters bracket
//!
//! # Loosen the refresh matching tolerance
//! stenod --refresh-tolerance 10
//!
//! # With Prometheus metrics
//! stenod --metrics-port 9400
//!
//! # With a configuration file
//! stenod --config /etc/stenolink/stenod.toml
//! ```

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{FileConfig, Settings};
use stenolink_core::{ReconcilePolicy, SessionManager};
use stenolink_transport::{FeedServer, Metrics, MetricsServer, ViewerServer};

/// Stenolink Daemon - realtime transcription feed server
#[derive(Parser, Debug)]
#[command(name = "stenod")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Feed port to listen on for vendor connections
    #[arg(long, env = "STENO_FEED_PORT")]
    feed_port: Option<u16>,

    /// WebSocket port to listen on for viewers
    #[arg(long, env = "STENO_VIEWER_PORT")]
    viewer_port: Option<u16>,

    /// Bind address
    #[arg(long, env = "STENO_BIND")]
    bind: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "STENO_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "STENO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Disable the viewer WebSocket server
    #[arg(long)]
    no_viewer: bool,

    /// Delimiter convention the feed uses (control, bracket)
    #[arg(long, env = "STENO_DELIMITERS")]
    delimiters: Option<String>,

    /// Nearest-prior refresh matching tolerance, in seconds
    #[arg(long, env = "STENO_REFRESH_TOLERANCE")]
    refresh_tolerance: Option<f64>,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "STENO_METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(
        args.feed_port,
        args.viewer_port,
        args.bind.clone(),
        args.log_level.clone(),
        args.delimiters.clone(),
        args.refresh_tolerance,
        args.metrics_port,
        file,
    )?;

    // Initialize logging
    let level = match settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print banner
    print_banner();

    // Shared session manager; the refresh tolerance is the only tunable of
    // the reconcile policy.
    let manager = Arc::new(SessionManager::with_policy(ReconcilePolicy {
        start_tolerance_secs: settings.refresh_tolerance_secs,
    }));

    let metrics = settings.metrics_port.map(|_| Arc::new(Metrics::new()));

    info!(
        feed_port = settings.feed_port,
        viewer_port = settings.viewer_port,
        bind = %settings.bind,
        delimiters = ?settings.delimiters,
        refresh_tolerance_secs = settings.refresh_tolerance_secs,
        metrics = metrics.is_some(),
        "Starting Stenolink daemon"
    );

    // Start servers
    let mut handles = Vec::new();

    let feed_addr: SocketAddr = format!("{}:{}", settings.bind, settings.feed_port).parse()?;
    let mut feed_server =
        FeedServer::new(manager.clone(), feed_addr).with_delimiters(settings.delimiters);
    if let Some(ref m) = metrics {
        feed_server = feed_server.with_metrics(m.clone());
    }
    handles.push(tokio::spawn(async move {
        if let Err(e) = feed_server.run().await {
            tracing::error!(error = %e, "Feed server error");
        }
    }));

    if !args.no_viewer {
        let viewer_addr: SocketAddr =
            format!("{}:{}", settings.bind, settings.viewer_port).parse()?;
        let mut viewer_server = ViewerServer::new(manager.clone(), viewer_addr);
        if let Some(ref m) = metrics {
            viewer_server = viewer_server.with_metrics(m.clone());
        }
        handles.push(tokio::spawn(async move {
            if let Err(e) = viewer_server.run().await {
                tracing::error!(error = %e, "Viewer server error");
            }
        }));
    }

    if let (Some(port), Some(m)) = (settings.metrics_port, metrics.clone()) {
        let metrics_addr: SocketAddr = format!("{}:{}", settings.bind, port).parse()?;
        let metrics_server = MetricsServer::new(m.clone(), metrics_addr);
        handles.push(tokio::spawn(async move {
            if let Err(e) = metrics_server.run().await {
                tracing::error!(error = %e, "Metrics server error");
            }
        }));

        // Background task keeping the session gauges current
        let stats_manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(15));
            loop {
                interval.tick().await;
                let stats = stats_manager.stats();
                m.sessions.set(stats.session_count as i64);
                m.viewer_subscribers.set(stats.subscriber_count as i64);
            }
        }));
    }

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  ╔═╗╔╦╗╔═╗╔╗╔╔═╗╦  ╦╔╗╔╦╔═
  ╚═╗ ║ ║╣ ║║║║ ║║  ║║║║╠╩╗
  ╚═╝ ╩ ╚═╝╝╚╝╚═╝╩═╝╩╝╚╝╩ ╩
  Realtime Transcription Feed Server
  Version {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
