//! API handlers for the validation service.

use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use narrate_budget::{TrimRequest, TrimResponse};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Request body for `POST /validate-audio-length`.
///
/// `text` is optional at the wire level so that a missing field can be
/// reported as a `400` with a JSON error body instead of axum's default
/// `422` rejection.
#[derive(Debug, Deserialize)]
pub struct ValidateAudioRequest {
    pub text: Option<String>,
    pub audio_length: Option<f64>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Handler for `POST /validate-audio-length`.
pub async fn validate_audio_length_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ValidateAudioRequest>, JsonRejection>,
) -> Result<Json<TrimResponse>, ApiError> {
    let Json(payload) = payload?;

    let text = payload
        .text
        .ok_or_else(|| ApiError::BadRequest("missing required field: text".to_string()))?;

    let request = TrimRequest {
        text,
        audio_length: payload.audio_length,
    };
    let response = state.budget.validate(&request);

    let trimmed = response.validated_text != request.text;
    tracing::debug!(
        audio_length = response.audio_length,
        supplied = request.audio_length.is_some(),
        trimmed,
        "validated audio length"
    );
    if trimmed {
        tracing::info!(
            audio_length = response.audio_length,
            max_duration_secs = state.budget.max_duration_secs,
            "trimmed over-budget text"
        );
    }

    Ok(Json(response))
}
