// Customer Quality - Web Server
// POST a batch of records, get the per-rule counts and the problematic entries back

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use customer_quality::{
    logging::init_logging, pipeline, AuditConfig, AuditError, IssueCounts, Record, RecordSet,
    Rule, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Used when a request carries no config of its own
    default_config: Arc<AuditConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Deserialize)]
struct ValidateRequest {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    #[serde(default)]
    config: Option<AuditConfig>,
}

#[derive(Serialize)]
struct ValidateResponse {
    total_records: usize,
    counts: IssueCounts,
    problematic_entries: Vec<EntryResponse>,
}

#[derive(Serialize)]
struct EntryResponse {
    row: usize,
    issues: Vec<Rule>,
    values: Vec<Option<String>>,
}

/// JSON → text, same policy as the SQLite source: null is missing,
/// everything else is its textual form
fn coerce_json(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn build_records(request: ValidateRequest, config: &AuditConfig) -> Result<RecordSet, AuditError> {
    let mut records = RecordSet::new(Schema::with_aliases(request.columns, &config.columns));
    for row in request.rows {
        records.push(Record::new(row.into_iter().map(coerce_json).collect()))?;
    }
    Ok(records)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/validate - Run every rule over the posted records
async fn validate(
    State(state): State<AppState>,
    Json(mut request): Json<ValidateRequest>,
) -> impl IntoResponse {
    let config = request
        .config
        .take()
        .unwrap_or_else(|| state.default_config.as_ref().clone());

    let records = match build_records(request, &config) {
        Ok(records) => records,
        Err(e) => {
            warn!("Rejected validation request: {}", e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::<ValidateResponse>::err(e.to_string())),
            )
                .into_response();
        }
    };

    let (detection, report) = pipeline::evaluate(&records, &config);
    let counts = detection.counts();

    let problematic_entries = report
        .iter()
        .map(|entry| EntryResponse {
            row: entry.row,
            issues: entry.rules.iter().collect(),
            values: entry.record.values().to_vec(),
        })
        .collect();

    info!(
        records = records.len(),
        reported = report.len(),
        "Validated {}",
        counts.summary()
    );

    (
        StatusCode::OK,
        Json(ApiResponse::ok(ValidateResponse {
            total_records: records.len(),
            counts,
            problematic_entries,
        })),
    )
        .into_response()
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/validate", post(validate))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(0)?;

    let default_config = match std::env::var("CUSTOMER_QUALITY_CONFIG") {
        Ok(path) => AuditConfig::from_file(&path)?,
        Err(_) => AuditConfig::default(),
    };
    let state = AppState {
        default_config: Arc::new(default_config),
    };

    let addr = std::env::var("CUSTOMER_QUALITY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("API: POST http://{}/api/validate", addr);

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")
}
