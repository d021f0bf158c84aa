use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{LogMealRequest, MealLogged};
use super::services::{log_meal_photo, MealError};
use crate::errors::{api_error, ApiError, ErrorResponse};
use crate::state::AppState;

impl From<MealError> for ApiError {
    fn from(e: MealError) -> Self {
        let message = e.to_string();
        match e {
            MealError::Analysis(_) => {
                api_error(StatusCode::BAD_GATEWAY, "analysis_failed", message)
            }
            MealError::NoGoalConfigured { estimate } => (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "no_goal_configured",
                    message,
                    estimate: Some(estimate),
                    progress: None,
                }),
            ),
            MealError::NotDurable { logged, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "persistence_failed",
                    message,
                    estimate: Some(logged.estimate),
                    progress: Some(logged.progress),
                }),
            ),
            MealError::Ledger(le) => ApiError::from(le),
        }
    }
}

pub fn meal_routes() -> Router<AppState> {
    Router::new().route("/users/:user_id/meals", post(log_meal))
}

/// POST /users/:user_id/meals { image_url }
#[instrument(skip(state, body))]
pub async fn log_meal(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<LogMealRequest>,
) -> Result<Json<MealLogged>, ApiError> {
    let image_url = body.image_url.trim();
    if image_url.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "invalid_image_url",
            "image_url is required",
        ));
    }

    match log_meal_photo(&state, user_id, image_url).await {
        Ok(logged) => Ok(Json(logged)),
        Err(e) => {
            if !matches!(e, MealError::NoGoalConfigured { .. }) {
                warn!(error = %e, user_id, "log_meal failed");
            }
            Err(e.into())
        }
    }
}
