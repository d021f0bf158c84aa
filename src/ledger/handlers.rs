use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{Progress, SetGoalRequest};
use super::services::{LedgerError, Standing};
use crate::errors::{api_error, ApiError, ErrorResponse};
use crate::state::AppState;

fn no_goal() -> ApiError {
    api_error(
        StatusCode::CONFLICT,
        "no_goal_configured",
        "no daily goal configured",
    )
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidGoal { .. } => {
                api_error(StatusCode::BAD_REQUEST, "invalid_goal", e.to_string())
            }
            LedgerError::Persist { progress, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "persistence_failed",
                    message: e.to_string(),
                    estimate: None,
                    progress,
                }),
            ),
        }
    }
}

pub fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/goal", put(set_goal))
        .route("/users/:user_id/status", get(get_status))
}

#[instrument(skip(state, body))]
pub async fn set_goal(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<SetGoalRequest>,
) -> Result<Json<Progress>, ApiError> {
    let raw = body.raw_goal();
    let progress = state.ledger.set_goal(user_id, &raw).await.map_err(|e| {
        warn!(error = %e, user_id, "set_goal rejected");
        ApiError::from(e)
    })?;
    Ok(Json(progress))
}

#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Progress>, ApiError> {
    match state.ledger.query_status(user_id).await {
        Standing::Tracking(p) => Ok(Json(p)),
        Standing::NoGoalConfigured => Err(no_goal()),
    }
}

#[cfg(test)]
mod handler_tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::services::test_support::MemoryStore;
    use crate::state::test_support::{state_with_store, ScriptedAnalyzer};

    fn goal(value: serde_json::Value) -> Json<SetGoalRequest> {
        Json(serde_json::from_value(serde_json::json!({ "goal": value })).unwrap())
    }

    #[tokio::test]
    async fn set_goal_then_status() {
        let state = AppState::fake().await;

        let Json(p) = set_goal(
            State(state.clone()),
            Path(9),
            goal("1900".into()),
        )
        .await
        .unwrap();
        assert_eq!(p, Progress::new(1900, 0));

        let Json(p) = get_status(State(state), Path(9)).await.unwrap();
        assert_eq!(p.remaining_kcal, 1900);
    }

    #[tokio::test]
    async fn bad_goal_is_bad_request() {
        let state = AppState::fake().await;
        let (status, Json(body)) = set_goal(
            State(state),
            Path(9),
            goal("abc".into()),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "invalid_goal");
    }

    #[tokio::test]
    async fn non_text_goals_are_invalid_goal() {
        let state = AppState::fake().await;
        for value in [serde_json::Value::Null, true.into(), serde_json::json!([2000])] {
            let (status, Json(body)) = set_goal(State(state.clone()), Path(9), goal(value))
                .await
                .unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.error, "invalid_goal");
        }

        let missing: SetGoalRequest = serde_json::from_str("{}").unwrap();
        let (status, _) = set_goal(State(state.clone()), Path(9), Json(missing))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.ledger.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn unsaved_goal_reports_applied_progress() {
        let store = Arc::new(MemoryStore::failing());
        let (state, _) = state_with_store(ScriptedAnalyzer::ok(1, "x"), store).await;

        let (status, Json(body)) = set_goal(State(state), Path(9), goal(1800.into()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, "persistence_failed");
        assert_eq!(body.progress, Some(Progress::new(1800, 0)));
    }

    #[tokio::test]
    async fn status_without_goal_is_conflict() {
        let state = AppState::fake().await;
        let (status, Json(body)) = get_status(State(state), Path(1)).await.unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "no_goal_configured");
    }
}
