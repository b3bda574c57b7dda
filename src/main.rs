//! Learning Progress Daemon
//!
//! Serves the progress core over HTTP/JSON, backed by a local SQLite file.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! learning-progress
//!
//! # Start with custom config
//! learning-progress --config /path/to/config.toml
//!
//! # Override port and storage directory
//! learning-progress --http-port 8096 --storage-dir /data/progress
//! ```
//!
//! Set `RUST_LOG=learning_progress=debug` for per-event audit logging.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use learning_progress::services::events::spawn_logging_listener;
use learning_progress::{Config, HttpServer, ProgressDb, ServiceSettings, Services};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "learning-progress")]
#[command(about = "Mastery tracking and learning recommendations service")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "LEARNING_PROGRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "LEARNING_PROGRESS_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "LEARNING_PROGRESS_HTTP_PORT")]
    http_port: Option<u16>,

    /// Address to bind the HTTP API on
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("learning_progress=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        "Starting learning-progress"
    );

    // Ensure storage directory exists
    tokio::fs::create_dir_all(&config.storage_dir).await?;

    // Save default config if it doesn't exist
    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let db = Arc::new(ProgressDb::open(&config.storage_dir)?);
    info!(path = %config.database_path().display(), stats = ?db.stats()?, "Database ready");

    let services = Services::new(db.clone(), ServiceSettings::from(&config));
    let listener_handle = spawn_logging_listener(services.events.clone());

    let http_addr: SocketAddr = format!("{}:{}", args.bind, config.http_port).parse()?;
    let http_server = Arc::new(HttpServer::new(services.progress.clone(), db, http_addr));

    info!("HTTP API available at http://{}", http_addr);
    info!("Endpoints:");
    info!("  GET  /health                                  - Health check");
    info!("  GET  /topics, PUT /topics/{{id}}                - Topic catalog");
    info!("  POST /learners/{{id}}/assessments               - Record assessment");
    info!("  POST /learners/{{id}}/progress                  - Manual progress update");
    info!("  GET  /learners/{{id}}/topics/{{topic}}/mastery    - Topic mastery detail");
    info!("  GET  /learners/{{id}}/heatmap                   - Skill heatmap");
    info!("  GET  /learners/{{id}}/recommendations           - Recommendations");
    info!("  GET  /learners/{{id}}/streak                    - Study streak");
    info!("  GET  /learners/{{id}}/analytics                 - Windowed analytics");
    info!("  *    /learners/{{id}}/sessions, /goals          - Sessions and goals");

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    listener_handle.abort();
    info!("Shutdown complete");
    Ok(())
}
