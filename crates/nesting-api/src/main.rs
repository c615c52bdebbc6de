use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use nesting_core::{Nester, NestingError, NestingRequest, NestingResult};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Plate Nesting API");

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    info!("API server listening on http://{addr}");
    info!("Try: curl http://localhost:{port}/api/health");

    axum::serve(listener, app()).await.expect("Server error");
}

fn app() -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/nest", post(nest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "plate-nesting-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Main nesting endpoint
async fn nest(Json(request): Json<NestingRequest>) -> Result<Json<NestingResult>, AppError> {
    info!(
        "Received nesting request with {} parts and {} stock sizes",
        request.parts.len(),
        request.stock_sizes.len()
    );

    let nester = Nester::new(request)?;
    // The search is CPU-bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || nester.nest())
        .await
        .map_err(anyhow::Error::from)??;

    info!(
        "Nesting complete: {} sheets, {:.2}% utilization, {} parts unplaced",
        result.summary.sheets_used,
        result.overall_utilization * 100.0,
        result.summary.leftover_parts
    );

    Ok(Json(result))
}

/// Application error type
enum AppError {
    Nesting(NestingError),
    Internal(anyhow::Error),
}

impl From<NestingError> for AppError {
    fn from(err: NestingError) -> Self {
        AppError::Nesting(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Nesting(err @ NestingError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        error!("Request error: {}", message);

        (
            status,
            Json(json!({
                "error": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn post_nest(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/nest")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_nest_returns_layout() {
        let (status, body) = post_nest(json!({
            "parts": [
                { "identifier": "PL_1", "thickness": "10mm", "width": 500, "length": 1000 },
                { "identifier": "PL_2", "thickness": "10mm", "width": 500, "length": 1000 }
            ],
            "stock_sizes": [{ "width": 1000, "length": 1000 }],
            "gap": 0
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sheets"].as_array().unwrap().len(), 1);
        assert_eq!(body["stock_purchase_summary"][0]["count"], 1);
        assert_eq!(body["bill_of_materials"][0]["quantity"], 2);
        assert_eq!(body["overall_utilization"], 1.0);

        let sheet = &body["sheets"][0];
        assert!(sheet["algorithm_id"].is_string());
        assert!(sheet["sort_strategy_id"].is_string());
        assert!(sheet.get("algorithm").is_none());
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        let (status, body) = post_nest(json!({
            "parts": [
                { "identifier": "PL", "thickness": "10mm", "width": -1, "length": 100 }
            ],
            "stock_sizes": [{ "width": 1000, "length": 1000 }]
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid input"));
    }
}
