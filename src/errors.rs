use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::ledger::dto::Progress;
use crate::vision::MealEstimate;

/// Error body for every endpoint. `error` is a stable machine code; the
/// chat transport turns it into a user-facing message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    /// Set when a photo was analyzed but could not be recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<MealEstimate>,
    /// Set when the ledger changed but the snapshot write failed. Retrying
    /// would count the change twice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            message: message.into(),
            estimate: None,
            progress: None,
        }),
    )
}
