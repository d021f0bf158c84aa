use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{ledger, meals};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1",
              Router::new()
                  .merge(ledger::router())
                  .merge(meals::router())
                  .route("/health", get(|| async { "ok" }))
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms = latency.as_millis() as u64, "response");
                        } else {
                            tracing::info!(%status, latency_ms = latency.as_millis() as u64, "response");
                        }
                    },
                ),
        )
}

/// Serves until Ctrl-C / SIGTERM, then writes the ledger one last time.
pub async fn serve(app: Router, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
        .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match state.ledger.flush().await {
        Ok(()) => tracing::info!(path = %state.config.ledger_path.display(), "ledger flushed on shutdown"),
        Err(e) => tracing::error!(error = %e, "final ledger flush failed"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod router_tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, json)
    }

    #[tokio::test]
    async fn goal_status_and_meal_through_router() {
        let app = build_app(AppState::fake().await);

        let (status, body) =
            call(&app, Method::PUT, "/api/v1/users/5/goal", Some(json!({ "goal": "2000" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["remaining_kcal"], 2000);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/users/5/meals",
            Some(json!({ "image_url": "https://files/lunch.jpg" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["estimate"]["description"], "Fake meal");
        assert_eq!(body["progress"]["consumed_kcal"], 500);

        let (status, body) = call(&app, Method::GET, "/api/v1/users/5/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["remaining_kcal"], 1500);
    }

    #[tokio::test]
    async fn error_codes_through_router() {
        let app = build_app(AppState::fake().await);

        let (status, body) =
            call(&app, Method::PUT, "/api/v1/users/5/goal", Some(json!({ "goal": null }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_goal");

        let (status, body) = call(&app, Method::GET, "/api/v1/users/6/status", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "no_goal_configured");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/users/6/meals",
            Some(json!({ "image_url": "https://files/x.jpg" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["estimate"]["calories"], 500);
    }

    #[tokio::test]
    async fn health_is_mounted_under_prefix() {
        let app = build_app(AppState::fake().await);

        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));

        let (status, _) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
