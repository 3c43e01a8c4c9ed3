use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::ServiceError;
use crate::predictor::PredictionService;
use crate::request::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub service: PredictionService,
    pub allowed_origins: Vec<String>,
    req_total: AtomicU64,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(service: PredictionService, allowed_origins: Vec<String>) -> Self {
        Self {
            service,
            allowed_origins,
            req_total: AtomicU64::new(0),
        }
    }

    fn count_request(&self) -> u64 {
        self.req_total.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            warn!(%status, "prediction failed: {}", err);
        } else {
            debug!(%status, "prediction rejected: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            success: false,
            message: self.message,
        });
        (self.status, payload).into_response()
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("Prediction service listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("prediction server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/health", get(handle_health))
        .route("/predict", post(handle_predict))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Permissive when `origins` is empty, otherwise restricted to the valid ones
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Load artifacts on the blocking pool; a no-op once they are loaded
async fn ensure_loaded(state: &SharedState) -> Result<(), ServiceError> {
    if state.service.is_loaded() {
        return Ok(());
    }

    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.service.bundle().map(|_| ()))
        .await
        .map_err(|err| ServiceError::Internal(format!("artifact loading task failed: {err}")))?
}

async fn handle_health(State(state): State<SharedState>) -> Response {
    state.count_request();

    match ensure_loaded(&state).await.and_then(|()| state.service.model_info()) {
        Ok(info) => (
            StatusCode::OK,
            Json(HealthResponse::Ok {
                message: "prediction service is running".to_string(),
                features: info.features,
                classes: info.classes,
                model_hash: info.model_hash,
            }),
        )
            .into_response(),
        Err(err) => {
            warn!("health check failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse::Error {
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn handle_predict(
    State(state): State<SharedState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let req_total = state.count_request();

    let Json(request) = payload.map_err(|rejection| {
        debug!(req_total, "rejected request body: {}", rejection.body_text());
        ApiError::bad_request(ServiceError::InvalidRequest(rejection.body_text()).to_string())
    })?;

    state.service.validate_request(&request)?;
    ensure_loaded(&state).await?;
    let response = state.service.predict(&request)?;
    info!(req_total, produto = %response.produto, "prediction served");
    Ok(Json(response))
}
