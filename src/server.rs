// src/server.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::anomaly::{detect_anomalies, AnomalyParams, AnomalyReport};
use crate::config::AppConfig;
use crate::error::TimesheetError;
use crate::reconcile::{reconcile, MatchedPair, ReconciliationSummary, UnmatchedRecord};
use crate::timesheet::TimesheetRow;

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Timesheet(#[from] TimesheetError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, kind, message) = match &self {
            AppError::Timesheet(err) => {
                warn!("Rejected timesheet request: {}", err);
                (StatusCode::UNPROCESSABLE_ENTITY, err.kind(), err.to_string())
            }
        };
        (status_code, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

// --- Application State ---

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

// --- Request / Response Models ---

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub client: Vec<TimesheetRow>,
    pub company: Vec<TimesheetRow>,
    #[serde(default)]
    pub include_matched: bool,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub discrepancies: Vec<MatchedPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<Vec<MatchedPair>>,
    pub unmatched: Vec<UnmatchedRecord>,
    pub summary: ReconciliationSummary,
}

#[derive(Debug, Deserialize)]
pub struct AnomalyRequest {
    pub timesheet: Vec<TimesheetRow>,
    pub contamination: Option<f64>,
    pub n_estimators: Option<usize>,
    pub seed: Option<u64>,
}

impl AnomalyRequest {
    fn params(&self, defaults: AnomalyParams) -> AnomalyParams {
        AnomalyParams {
            contamination: self.contamination.unwrap_or(defaults.contamination),
            n_estimators: self.n_estimators.unwrap_or(defaults.n_estimators),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }
}

// --- Handlers ---

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn reconcile_handler(
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    info!(
        "Reconcile request: client_rows={}, company_rows={}",
        request.client.len(),
        request.company.len()
    );
    let reconciliation = reconcile(&request.client, &request.company)?;
    Ok(Json(ReconcileResponse {
        discrepancies: reconciliation.discrepancies(),
        matched: request
            .include_matched
            .then(|| reconciliation.matched().to_vec()),
        unmatched: reconciliation.unmatched().to_vec(),
        summary: reconciliation.summary(),
    }))
}

async fn anomalies_handler(
    State(state): State<AppState>,
    Json(request): Json<AnomalyRequest>,
) -> Result<Json<AnomalyReport>, AppError> {
    let params = request.params(state.config.anomaly_params());
    info!(
        "Anomaly request: rows={}, params={:?}",
        request.timesheet.len(),
        params
    );
    let report = detect_anomalies(&request.timesheet, &params)?;
    Ok(Json(report))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/reconcile", post(reconcile_handler))
        .route("/api/anomalies", post(anomalies_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process is stopped.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_address();
    let app = router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
