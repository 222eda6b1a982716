//! Manual manifest rebuild
//!
//! `GET|POST /rebuild?orgId=&vehicleKey=` re-indexes one vehicle and rewrites
//! its manifest synchronously.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::VehicleQuery;
use crate::error::{ApiError, ApiResult};
use crate::manifest::rebuild_manifest;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub ok: bool,
    pub count: usize,
    pub path: String,
}

/// GET|POST /rebuild
pub async fn rebuild(
    State(state): State<AppState>,
    Query(query): Query<VehicleQuery>,
) -> ApiResult<Json<RebuildResponse>> {
    let (org, vehicle) = query.identity()?;

    match rebuild_manifest(state.store.as_ref(), &org, &vehicle).await {
        Ok(outcome) => {
            info!(
                org_id = %org,
                vehicle_key = %vehicle,
                count = outcome.count,
                path = %outcome.path,
                "manifest.rebuild"
            );
            Ok(Json(RebuildResponse {
                ok: true,
                count: outcome.count,
                path: outcome.path,
            }))
        }
        Err(e) => {
            error!(org_id = %org, vehicle_key = %vehicle, error = %e, "manifest.rebuild.error");
            state.record_error(&e).await;
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

pub fn rebuild_routes() -> Router<AppState> {
    Router::new().route("/rebuild", get(rebuild).post(rebuild))
}
