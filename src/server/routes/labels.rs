//! Status label endpoint.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::server::state::AppState;
use crate::store::StatusLabel;

/// GET /api/labels - The label set status writes are validated against.
pub async fn get_labels(State(state): State<Arc<AppState>>) -> Json<Vec<StatusLabel>> {
    Json(state.service.labels())
}
