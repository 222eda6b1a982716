//! HTTP API handlers for vi-manifest

pub mod events;
pub mod health;
pub mod manifest;
pub mod rebuild;

pub use events::event_routes;
pub use health::health_routes;
pub use manifest::manifest_routes;
pub use rebuild::rebuild_routes;

use serde::Deserialize;
use vi_common::{OrgId, VehicleKey};

use crate::error::ApiError;

/// `?orgId=&vehicleKey=` query shared by the vehicle endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    pub org_id: Option<String>,
    pub vehicle_key: Option<String>,
}

impl VehicleQuery {
    /// Both identifiers, validated; 400 when either is missing or blank
    pub fn identity(&self) -> Result<(OrgId, VehicleKey), ApiError> {
        let org = self.org_id.as_deref().map(str::trim).unwrap_or_default();
        let vehicle = self.vehicle_key.as_deref().map(str::trim).unwrap_or_default();
        if org.is_empty() || vehicle.is_empty() {
            return Err(ApiError::BadRequest(
                "orgId and vehicleKey required".to_string(),
            ));
        }
        Ok((OrgId::parse(org)?, VehicleKey::parse(vehicle)?))
    }
}
