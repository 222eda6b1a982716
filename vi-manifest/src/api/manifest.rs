use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::VehicleQuery;
use crate::error::{ApiError, ApiResult};
use crate::manifest::{read_manifest, VehicleManifest};
use crate::AppState;

/// GET /manifest?orgId=&vehicleKey=
pub async fn get_manifest(
    State(state): State<AppState>,
    Query(query): Query<VehicleQuery>,
) -> ApiResult<Json<VehicleManifest>> {
    let (org, vehicle) = query.identity()?;
    read_manifest(state.store.as_ref(), &org, &vehicle)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no manifest for {org}/{vehicle}")))
}

pub fn manifest_routes() -> Router<AppState> {
    Router::new().route("/manifest", get(get_manifest))
}
