//! Storage notification ingress

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::dispatcher::ObjectFinalized;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub accepted: bool,
    pub published: usize,
}

/// POST /events/object-finalized
///
/// Always accepted; skipped or failed dispatches are only logged.
pub async fn object_finalized(
    State(state): State<AppState>,
    Json(event): Json<ObjectFinalized>,
) -> (StatusCode, Json<EventAccepted>) {
    let effects = state.dispatcher.handle(&event);
    let report = state.runner.apply(effects).await;
    if let Some(error) = &report.failed {
        state.record_error(error).await;
    }

    (
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            accepted: true,
            published: report.published,
        }),
    )
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events/object-finalized", post(object_finalized))
}
