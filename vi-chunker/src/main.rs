//! vi-chunker - offline manual chunking tool
//!
//! Usage: `vi-chunker --vehicleKey=honda/cr-v/2020/ex --in=./out/crv2020.txt`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use vi_chunker::chunker::{DEFAULT_HARD_MAX, DEFAULT_TARGET};
use vi_chunker::credentials::Credentials;
use vi_chunker::seed::{seed_manual_chunks, SeedRequest, DEFAULT_SOURCE};
use vi_chunker::ChunkOptions;
use vi_common::config::TomlConfig;
use vi_common::db::init_database;
use vi_common::logging::init_tracing;
use vi_common::VehicleKey;

#[derive(Parser, Debug)]
#[command(name = "vi-chunker")]
#[command(about = "Split a vehicle manual into stored chunks", long_about = None)]
#[command(version)]
struct Args {
    /// Vehicle key, e.g. honda/cr-v/2020/ex
    #[arg(long = "vehicle-key", visible_alias = "vehicleKey")]
    vehicle_key: String,

    /// Plain-text manual
    #[arg(long = "in")]
    input: PathBuf,

    /// Source label stored with the chunk count
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: String,

    /// Soft chunk length in characters
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    target: usize,

    /// Hard chunk length limit in characters
    #[arg(long, default_value_t = DEFAULT_HARD_MAX)]
    hard_max: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();
    init_tracing(&config.logging.level);

    info!("Starting vi-chunker v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("Manual seeding failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let credentials = Credentials::from_env()?;
    info!(
        project_id = %credentials.project_id,
        database = %credentials.database_path.display(),
        "Loaded credentials"
    );

    let request = SeedRequest {
        vehicle_key: VehicleKey::parse(&args.vehicle_key)?,
        input: args.input,
        source: args.source,
        options: ChunkOptions::new(args.target, args.hard_max)?,
    };

    let pool = init_database(&credentials.database_path)
        .await
        .with_context(|| format!("Failed to open {}", credentials.database_path.display()))?;

    let outcome = seed_manual_chunks(&pool, &request).await?;
    info!(
        vehicle_key = %request.vehicle_key,
        deleted = outcome.deleted,
        written = outcome.written,
        "Manual seeding complete"
    );

    pool.close().await;
    Ok(())
}
