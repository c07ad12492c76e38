//! Status read/write endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StatusError;
use crate::server::state::AppState;
use crate::service::{GetStatusRequest, SetStatusRequest};
use crate::store::StatusRecord;

#[derive(Debug, Serialize, Deserialize)]
pub struct GetStatusResponse {
    pub status: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetStatusResponse {
    pub data: Vec<StatusRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub required: bool,
}

/// POST /api/get-status - Current status of one record.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GetStatusRequest>, JsonRejection>,
) -> Result<Json<GetStatusResponse>, StatusError> {
    let Json(request) = payload.map_err(reject_body)?;
    let status = state.service.get_status(&request)?;

    Ok(Json(GetStatusResponse {
        status: status.code(),
    }))
}

/// POST /api/update-status (and /api/update) - Write a new status.
///
/// The record must already exist; unknown ids get 404.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<SetStatusResponse>, StatusError> {
    let Json(request) = payload.map_err(reject_body)?;
    let data = state
        .service
        .set_status(&request, bearer_token(&headers))?;

    Ok(Json(SetStatusResponse { data }))
}

/// POST /api/verify-token - Checks a driver token without writing.
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<VerifyTokenResponse> {
    let valid = state.service.verify_credential(bearer_token(&headers));
    if !valid {
        tracing::debug!("Driver token verification failed");
    }

    Json(VerifyTokenResponse {
        valid,
        required: state.service.requires_credential(),
    })
}

/// Extracts the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn reject_body(rejection: JsonRejection) -> StatusError {
    StatusError::validation(format!("Invalid request body: {}", rejection.body_text()))
}
