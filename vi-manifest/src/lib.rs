//! vi-manifest library interface
//!
//! Builds per-vehicle video manifests from the media stored in a bucket,
//! either on demand over HTTP or in response to upload notifications.

pub mod api;
pub mod checksum;
pub mod dispatcher;
pub mod effects;
pub mod error;
pub mod indexer;
pub mod manifest;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use std::fmt;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use vi_common::bus::MessageBus;
use vi_common::storage::ObjectStore;

use crate::dispatcher::Dispatcher;
use crate::effects::EffectRunner;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Media bucket
    pub store: Arc<dyn ObjectStore>,
    /// Bus carrying rebuild requests
    pub bus: MessageBus,
    pub dispatcher: Dispatcher,
    pub runner: EffectRunner,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, bus: MessageBus, dispatcher: Dispatcher) -> Self {
        let runner = EffectRunner::new(store.clone(), bus.clone());
        Self {
            store,
            bus,
            dispatcher,
            runner,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, error: impl fmt::Display) {
        *self.last_error.write().await = Some(error.to_string());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::rebuild_routes())
        .merge(api::event_routes())
        .merge(api::manifest_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
