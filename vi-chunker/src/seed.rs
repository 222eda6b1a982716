//! Manual seeding: read a text file, chunk it, replace the stored chunks

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use tracing::{debug, info};
use vi_common::db::{replace_manual_chunks, ChunkReplaceOutcome};
use vi_common::VehicleKey;

use crate::chunker::{chunkify, ChunkOptions};
use crate::error::{ChunkerError, Result};

/// Source label recorded when none is given
pub const DEFAULT_SOURCE: &str = "local-pdf";

#[derive(Debug, Clone)]
pub struct SeedRequest {
    pub vehicle_key: VehicleKey,
    pub input: PathBuf,
    pub source: String,
    pub options: ChunkOptions,
}

/// Read `path` as UTF-8, rejecting blank input
pub async fn read_manual_text(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ChunkerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if text.trim().is_empty() {
        return Err(ChunkerError::EmptyInput(path.to_path_buf()));
    }
    Ok(text)
}

pub async fn seed_manual_chunks(
    pool: &SqlitePool,
    request: &SeedRequest,
) -> Result<ChunkReplaceOutcome> {
    let text = read_manual_text(&request.input).await?;
    let chunks = chunkify(&text, &request.options);
    debug!(
        input = %request.input.display(),
        chars = text.chars().count(),
        chunks = chunks.len(),
        "Chunked manual"
    );

    let outcome =
        replace_manual_chunks(pool, &request.vehicle_key, &chunks, &request.source).await?;
    info!(
        "Wrote {} chunks to vehicles/{}/manual_chunks",
        outcome.written, outcome.doc_id
    );
    Ok(outcome)
}
