//! HTTP API: price prediction, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pricing_lib::{
    health::{ComponentStatus, HealthRegistry},
    ErrorResponse, PredictionService, ServiceMetrics, VehicleAttributes,
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
        }
    }
}

/// Predict the price of one vehicle
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VehicleAttributes>, JsonRejection>,
) -> Response {
    let attrs = match payload {
        Ok(Json(attrs)) => attrs,
        Err(rejection) => return reject(rejection),
    };

    // Inference is CPU-bound; keep it off the async workers.
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.predict(&attrs)).await;

    state
        .health_registry
        .record_pipeline(state.service.failure_streak())
        .await;

    match result {
        Ok(Ok(prediction)) => (StatusCode::OK, Json(prediction)).into_response(),
        Ok(Err(e)) => internal_error("Prediction failed", format!("{:#}", e)),
        Err(e) => {
            state.metrics.inc_prediction_errors();
            internal_error("Prediction task failed", e.to_string())
        }
    }
}

fn reject(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let details = rejection.body_text();
    warn!(status = %status, details = %details, "Rejected predict request");
    (
        status,
        Json(ErrorResponse::new("Invalid request body").with_details(details)),
    )
        .into_response()
}

fn internal_error(message: &str, details: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message).with_details(details)),
    )
        .into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving predictions
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// CORS for the allowed frontends; methods and headers are mirrored since
/// wildcards are not permitted alongside credentials.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Start the API server and run until `shutdown` completes
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    allowed_origins: &[String],
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let health_registry = state.health_registry.clone();
    let app = create_router(state, allowed_origins);

    info!(addr = %addr, origins = ?allowed_origins, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    health_registry.set_serving(true).await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    health_registry.set_serving(false).await;
    Ok(())
}
