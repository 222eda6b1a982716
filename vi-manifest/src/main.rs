//! vi-manifest - vehicle video manifest service
//!
//! Serves the rebuild and upload-notification endpoints and runs the rebuild
//! worker on the in-process bus.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use vi_common::bus::MessageBus;
use vi_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use vi_common::logging::init_tracing;
use vi_common::storage::{FsObjectStore, ObjectStore};
use vi_manifest::dispatcher::Dispatcher;
use vi_manifest::effects::EffectRunner;
use vi_manifest::worker::RebuildWorker;
use vi_manifest::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "vi-manifest")]
#[command(about = "Vehicle video manifest service", long_about = None)]
#[command(version)]
struct Args {
    /// Root folder holding buckets and the record database
    #[arg(short, long, env = "VI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "VI_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Media bucket (overrides [storage] default_bucket)
    #[arg(short, long)]
    bucket: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TomlConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_or_default(),
    };

    init_tracing(&config.logging.level);

    info!(
        "Starting vi-manifest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("vi-manifest")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let bucket = args
        .bucket
        .clone()
        .unwrap_or_else(|| config.storage.default_bucket.clone());
    let bucket_path = initializer.bucket_path(&bucket);
    tokio::fs::create_dir_all(&bucket_path)
        .await
        .with_context(|| format!("Failed to create bucket folder {}", bucket_path.display()))?;
    info!("Bucket {} at {}", bucket, bucket_path.display());

    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(bucket.clone(), bucket_path));
    let bus = MessageBus::new(config.messaging.capacity);

    // Subscribe before serving so no upload notification is published into
    // an empty bus
    let subscription = bus.subscribe(&config.messaging.topic);
    let worker = RebuildWorker::new(store.clone());
    let worker_runner = EffectRunner::new(store.clone(), bus.clone());
    let worker_handle = tokio::spawn(worker.run(subscription, worker_runner));

    let dispatcher = Dispatcher::new(bucket, config.messaging.topic.clone());
    let state = AppState::new(store, bus, dispatcher);
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("vi-manifest listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    worker_handle.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
