// GPA Planner - Web Server
// JSON API over a single in-memory grade sheet session

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use clap::Parser;
use gpa_planner::{
    reader_for, CourseRecord, CourseRegistry, EditDelta, EditReport, GradeSheet, PlannerConfig,
    SessionAggregate, StatusKind,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gpa-server")]
#[command(about = "Serve a grade sheet session over HTTP", long_about = None)]
struct Args {
    /// Transcript to load at startup (blank sheet when omitted)
    #[arg(value_name = "TRANSCRIPT")]
    transcript: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    catalog: Option<PathBuf>,

    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    sheet: Arc<Mutex<GradeSheet>>,
}

impl AppState {
    // A panicked handler leaves the sheet fully recomputed or untouched,
    // so a poisoned lock is still safe to read.
    fn sheet(&self) -> MutexGuard<'_, GradeSheet> {
        self.sheet.lock().unwrap_or_else(PoisonError::into_inner)
    }
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

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Sheet response
#[derive(Serialize)]
struct SheetResponse {
    student_name: String,
    student_id: String,
    revision: u64,
    records: Vec<CourseRecord>,
    aggregate: SessionAggregate,
}

/// Summary response
#[derive(Serialize)]
struct SummaryResponse {
    aggregate: SessionAggregate,
    status_counts: BTreeMap<StatusKind, usize>,
}

/// Edit response
#[derive(Serialize)]
struct EditResponse {
    report: EditReport,
    revision: u64,
    aggregate: SessionAggregate,
}

impl From<&GradeSheet> for SheetResponse {
    fn from(sheet: &GradeSheet) -> Self {
        Self {
            student_name: sheet.student_name().to_string(),
            student_id: sheet.student_id().to_string(),
            revision: sheet.revision(),
            records: sheet.records().to_vec(),
            aggregate: *sheet.aggregate(),
        }
    }
}

impl From<&GradeSheet> for SummaryResponse {
    fn from(sheet: &GradeSheet) -> Self {
        Self {
            aggregate: *sheet.aggregate(),
            status_counts: sheet.status_counts(),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/sheet - Full grade sheet
async fn get_sheet(State(state): State<AppState>) -> impl IntoResponse {
    let sheet = state.sheet();
    Json(ApiResponse::ok(SheetResponse::from(&*sheet)))
}

/// GET /api/summary - Aggregate and status counts
async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    let sheet = state.sheet();
    Json(ApiResponse::ok(SummaryResponse::from(&*sheet)))
}

/// GET /api/courses/:code - One course record
async fn get_course(State(state): State<AppState>, Path(code): Path<String>) -> impl IntoResponse {
    let sheet = state.sheet();

    match sheet.record(&code) {
        Some(record) => (StatusCode::OK, Json(ApiResponse::ok(record.clone()))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<CourseRecord>::err(format!("Unknown course: {}", code))),
        )
            .into_response(),
    }
}

/// POST /api/edits - Apply an edited-cells delta
async fn post_edits(State(state): State<AppState>, Json(delta): Json<EditDelta>) -> impl IntoResponse {
    let mut sheet = state.sheet();

    let report = sheet.apply_edits(&delta);
    if !report.skipped.is_empty() {
        warn!(skipped = report.skipped.len(), "Some edits were skipped");
    }
    info!(applied = report.applied, revision = sheet.revision(), "Edits applied");

    Json(ApiResponse::ok(EditResponse {
        report,
        revision: sheet.revision(),
        aggregate: *sheet.aggregate(),
    }))
}

/// POST /api/reset - Empty every attempt ledger
async fn post_reset(State(state): State<AppState>) -> impl IntoResponse {
    let mut sheet = state.sheet();
    sheet.reset();
    info!("Sheet reset");
    Json(ApiResponse::ok(SummaryResponse::from(&*sheet)))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/sheet", get(get_sheet))
        .route("/summary", get(get_summary))
        .route("/courses/:code", get(get_course))
        .route("/edits", post(post_edits))
        .route("/reset", post(post_reset))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

fn load_session(args: &Args) -> Result<GradeSheet> {
    let config = match &args.config {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PlannerConfig::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => CourseRegistry::from_file(path)
            .with_context(|| format!("Failed to load catalog: {}", path.display()))?,
        None => CourseRegistry::new(),
    };

    let mut sheet = GradeSheet::new(&catalog, config);
    if let Some(path) = &args.transcript {
        let transcript = reader_for(path, &sheet.config().layout)
            .read(path)
            .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
        let report = sheet.ingest(&transcript);
        info!(file = %path.display(), "{}", report.summary());
    }
    Ok(sheet)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let sheet = load_session(&args)?;
    info!(
        courses = sheet.len(),
        gpa = sheet.aggregate().final_gpa,
        "Session ready"
    );

    let state = AppState {
        sheet: Arc::new(Mutex::new(sheet)),
    };

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    info!(addr = %args.addr, "🚀 Server running, API under /api");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;
    Ok(())
}
