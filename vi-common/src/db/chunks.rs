//! Manual chunk persistence
//!
//! A vehicle's chunk set is always replaced wholesale: delete every stored
//! chunk, write the new ones in batches, then upsert the vehicle's manual
//! metadata. The three steps are separate transactions, so a crash between
//! them leaves the vehicle with zero or partial chunks until the next run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::vehicle::VehicleKey;
use crate::Result;

/// Rows written per transaction
pub const CHUNK_WRITE_BATCH: usize = 400;

/// One stored chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualChunk {
    /// Zero-padded ordinal (`0001`)
    pub id: String,
    /// 1-based position
    pub order: i64,
    pub text: String,
}

/// Manual summary stored on the vehicle record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualMetadata {
    pub chunk_count: i64,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// Result of a chunk replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReplaceOutcome {
    pub doc_id: String,
    pub deleted: u64,
    pub written: usize,
}

/// Chunk id for a 1-based position
pub fn chunk_id(order: usize) -> String {
    format!("{order:04}")
}

/// Replace the stored chunk set of `vehicle` with `chunks` (in order)
pub async fn replace_manual_chunks(
    pool: &SqlitePool,
    vehicle: &VehicleKey,
    chunks: &[String],
    source: &str,
) -> Result<ChunkReplaceOutcome> {
    let doc_id = vehicle.doc_id();

    let deleted = sqlx::query("DELETE FROM manual_chunks WHERE doc_id = ?")
        .bind(&doc_id)
        .execute(pool)
        .await?
        .rows_affected();
    debug!(doc_id = %doc_id, deleted, "Cleared previous manual chunks");

    let mut written = 0usize;
    for batch in chunks.chunks(CHUNK_WRITE_BATCH) {
        let mut tx = pool.begin().await?;
        for text in batch {
            let order = written + 1;
            sqlx::query(
                r#"
                INSERT INTO manual_chunks (doc_id, chunk_id, chunk_order, text)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(doc_id, chunk_id) DO UPDATE SET
                    chunk_order = excluded.chunk_order,
                    text = excluded.text
                "#,
            )
            .bind(&doc_id)
            .bind(chunk_id(order))
            .bind(order as i64)
            .bind(text)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }
        tx.commit().await?;
        debug!(doc_id = %doc_id, written, "Committed chunk batch");
    }

    upsert_manual_metadata(pool, vehicle, written as i64, source, Utc::now()).await?;

    info!(
        doc_id = %doc_id,
        vehicle_key = %vehicle,
        deleted,
        written,
        "Replaced manual chunks"
    );

    Ok(ChunkReplaceOutcome {
        doc_id,
        deleted,
        written,
    })
}

/// Upsert the manual summary, leaving other vehicle fields untouched
pub async fn upsert_manual_metadata(
    pool: &SqlitePool,
    vehicle: &VehicleKey,
    chunk_count: i64,
    source: &str,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vehicles (doc_id, vehicle_key, manual_chunk_count, manual_source, manual_updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(doc_id) DO UPDATE SET
            manual_chunk_count = excluded.manual_chunk_count,
            manual_source = excluded.manual_source,
            manual_updated_at = excluded.manual_updated_at,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(vehicle.doc_id())
    .bind(vehicle.as_str())
    .bind(chunk_count)
    .bind(source)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Stored chunks of `vehicle` in order
pub async fn load_manual_chunks(
    pool: &SqlitePool,
    vehicle: &VehicleKey,
) -> Result<Vec<ManualChunk>> {
    let rows = sqlx::query_as::<_, (String, i64, String)>(
        "SELECT chunk_id, chunk_order, text FROM manual_chunks WHERE doc_id = ? ORDER BY chunk_order",
    )
    .bind(vehicle.doc_id())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, order, text)| ManualChunk { id, order, text })
        .collect())
}

/// Manual summary of `vehicle`, if it was ever chunked
pub async fn load_manual_metadata(
    pool: &SqlitePool,
    vehicle: &VehicleKey,
) -> Result<Option<ManualMetadata>> {
    let row = sqlx::query_as::<_, (Option<i64>, Option<String>, Option<DateTime<Utc>>)>(
        "SELECT manual_chunk_count, manual_source, manual_updated_at FROM vehicles WHERE doc_id = ?",
    )
    .bind(vehicle.doc_id())
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((Some(chunk_count), Some(source), Some(updated_at))) => Some(ManualMetadata {
            chunk_count,
            source,
            updated_at,
        }),
        _ => None,
    })
}
