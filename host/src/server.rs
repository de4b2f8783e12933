//! ==============================================================================
//! server.rs - read-only dashboard api
//! ==============================================================================
//!
//! routes:
//!     GET /                plain-text latest activity report
//!     GET /health          liveness probe
//!     GET /api/report      latest report as json (null before the first one)
//!     GET /api/zones       zone status rows from the latest climate cycle
//!     GET /api/monitoring  current monitoring window {open, phase}
//!
//! relationships:
//!     - reads: state.rs (published zones and reports), reporter.rs (window phase)
//!     - used by: main.rs
//!
//! ==============================================================================

use crate::lifecycle::ShutdownSignal;
use crate::reporter::MonitoringReporter;
use crate::state::{DashboardState, SharedState};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

const NO_REPORT_YET: &str = "No report generated yet - the first monitoring window is still open.\n";

type ApiState = (SharedState, MonitoringReporter);

pub fn create_router(state: SharedState, reporter: MonitoringReporter) -> Router {
    Router::new()
        .route("/", get(report_text_handler))
        .route("/health", get(health_handler))
        .route("/api/report", get(report_handler))
        .route("/api/zones", get(zones_handler))
        .route("/api/monitoring", get(monitoring_handler))
        .layer(CorsLayer::permissive())
        .with_state((state, reporter))
}

/// serve until shutdown is triggered
pub async fn run_server(
    bind: &str,
    state: SharedState,
    reporter: MonitoringReporter,
    mut shutdown: ShutdownSignal,
) -> Result<()> {
    let app = create_router(state, reporter);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind dashboard to {}", bind))?;
    info!("[SERVER] Dashboard live at http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
        .context("dashboard server error")?;

    info!("[SERVER] Dashboard stopped");
    Ok(())
}

// ==============================================================================
// handlers
// ==============================================================================

async fn report_text_handler(State((state, _)): State<ApiState>) -> String {
    let state = state.read().await;
    match &state.latest_report {
        Some(report) => report.text.clone(),
        None => NO_REPORT_YET.to_string(),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
}

async fn report_handler(State((state, _)): State<ApiState>) -> Json<serde_json::Value> {
    let state = state.read().await;
    Json(serde_json::json!({
        "report": state.latest_report,
        "reports_published": state.reports_published,
    }))
}

async fn zones_handler(State((state, _)): State<ApiState>) -> Json<DashboardZones> {
    let state = state.read().await;
    Json(DashboardZones::from(&*state))
}

async fn monitoring_handler(State((_, reporter)): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "open": reporter.is_open(),
        "phase": reporter.phase(),
    }))
}

#[derive(serde::Serialize)]
struct DashboardZones {
    zones: Vec<crate::control::ZoneStatusRow>,
    last_update: Option<chrono::DateTime<chrono::Local>>,
}

impl From<&DashboardState> for DashboardZones {
    fn from(state: &DashboardState) -> Self {
        Self {
            zones: state.zones.clone(),
            last_update: state.last_update,
        }
    }
}
