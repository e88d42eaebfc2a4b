//! # HTTP daemon
//!
//! JSON endpoints over an [`InventoryService`]:
//!
//! | Method | Path                | Body                   |
//! |--------|---------------------|------------------------|
//! | POST   | `/api/search-bins`  | `{sku, value}`         |
//! | GET    | `/api/skus`         |                        |
//! | POST   | `/api/generate-qr`  | `{binNo, sku, value}`  |
//! | POST   | `/api/process-scan` | `{binNo, sku, value}`  |
//! | GET    | `/api/inventory`    |                        |
//! | GET    | `/health`           |                        |
//!
//! Every failure answers with `{"error": "<message>"}`.
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/process-scan \
//!   -H "Content-Type: application/json" \
//!   -d '{"binNo": "A1", "sku": "WIDGET", "value": 2}'
//! ```

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    codec::{self, text_field, ScanFields},
    error::ServiceError,
    service::{HealthReport, InventoryService, MutationResult},
    table::Row,
};

/// Error payload returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) | ServiceError::Encode(_) | ServiceError::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("daemon: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchBinsRequest {
    #[serde(default, deserialize_with = "text_field")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    pub qr_code: String,
    pub scan_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessScanResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: MutationResult,
}

#[derive(Clone)]
struct AppState {
    service: Arc<dyn InventoryService>,
    scan_base_url: Arc<str>,
}

/// HTTP front end for an inventory service.
pub struct InventoryDaemon {
    state: AppState,
}

impl InventoryDaemon {
    /// `scan_base_url` is the page the generated QR codes point at.
    pub fn new(service: Arc<dyn InventoryService>, scan_base_url: impl Into<String>) -> Self {
        Self {
            state: AppState {
                service,
                scan_base_url: scan_base_url.into().into(),
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/search-bins", post(search_bins))
            .route("/api/skus", get(list_skus))
            .route("/api/generate-qr", post(generate_qr))
            .route("/api/process-scan", post(process_scan))
            .route("/api/inventory", get(list_inventory))
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn serve(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("daemon: listening on {}", listener.local_addr()?);
        tracing::info!("daemon: QR codes point at {}", self.state.scan_base_url);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("daemon: shut down");
        Ok(())
    }
}

async fn search_bins(
    State(state): State<AppState>,
    payload: Result<Json<SearchBinsRequest>, JsonRejection>,
) -> ApiResult<Vec<Row>> {
    let Json(body) = payload?;
    let sku = body
        .sku
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing field `sku`"))?;
    let raw = body
        .value
        .ok_or_else(|| ApiError::bad_request("missing field `value`"))?;
    let threshold: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid value {raw:?}: expected an integer")))?;

    Ok(Json(state.service.search_bins(&sku, threshold).await?))
}

async fn list_skus(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.service.list_skus().await?))
}

async fn generate_qr(
    State(state): State<AppState>,
    payload: Result<Json<ScanFields>, JsonRejection>,
) -> ApiResult<GenerateQrResponse> {
    let Json(fields) = payload?;
    let req =
        codec::decode(&fields).map_err(|e| ApiError::from(ServiceError::Validation(e.to_string())))?;
    let artifact = state
        .service
        .request_mutation(req, &state.scan_base_url)
        .await?;
    Ok(Json(GenerateQrResponse {
        qr_code: artifact.data_url,
        scan_url: artifact.url,
    }))
}

async fn process_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanFields>, JsonRejection>,
) -> ApiResult<ProcessScanResponse> {
    let Json(fields) = payload?;
    let result = state.service.apply_mutation(&fields).await?;
    Ok(Json(ProcessScanResponse {
        success: true,
        result,
    }))
}

async fn list_inventory(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    Ok(Json(state.service.list_inventory().await?))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.health().await;
    let status = if report.error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("daemon: failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("daemon: failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("daemon: received Ctrl+C"),
        () = terminate => tracing::info!("daemon: received SIGTERM"),
    }
}
