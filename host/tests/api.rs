//! Dashboard route tests against the router, no socket involved.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Local;
use greenhouse_host::control::{ZoneStatus, ZoneStatusRow};
use greenhouse_host::domain::{Range, ServiceCategory, ZoneActuatorState};
use greenhouse_host::report::{ActivityReport, CategorySection, Completeness};
use greenhouse_host::reporter::MonitoringReporter;
use greenhouse_host::server::create_router;
use greenhouse_host::state::{DashboardState, SharedState};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt; // for oneshot

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    (status, body.to_vec())
}

async fn get_json(app: axum::Router, uri: &str) -> Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).expect("Failed to parse JSON")
}

fn sample_report() -> ActivityReport {
    let sections: Vec<CategorySection> = ServiceCategory::ALL
        .into_iter()
        .map(|category| CategorySection { category, records: Vec::new() })
        .collect();
    ActivityReport::build(&sections, Local::now(), Completeness::Complete)
}

async fn published_state() -> SharedState {
    let state = DashboardState::shared();
    {
        let mut dashboard = state.write().await;
        dashboard.publish_zones(vec![ZoneStatusRow {
            zone_id: "Zone-B".to_string(),
            crop: "Cucumbers".to_string(),
            temperature: 24.5,
            humidity: 88.0,
            temp_range: Range::new(23.0, 28.0),
            humidity_range: Range::new(70.0, 85.0),
            status: ZoneStatus::HumidityAlert,
            actuators: ZoneActuatorState {
                dehumidifier_active: true,
                ..Default::default()
            },
        }]);
        dashboard.publish_report(sample_report());
    }
    state
}

#[tokio::test]
async fn root_serves_placeholder_before_first_report() {
    let app = create_router(DashboardState::shared(), MonitoringReporter::default());
    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().starts_with("No report generated yet"));
}

#[tokio::test]
async fn root_serves_latest_report_text() {
    let state = published_state().await;
    let app = create_router(state, MonitoringReporter::default());
    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("GREENHOUSE SYSTEM ACTIVITY REPORT"));
    assert!(text.contains("Total actions recorded: 0"));
}

#[tokio::test]
async fn report_endpoint_is_null_then_populated() {
    let app = create_router(DashboardState::shared(), MonitoringReporter::default());
    let body = get_json(app, "/api/report").await;
    assert!(body["report"].is_null());
    assert_eq!(body["reports_published"], 0);

    let app = create_router(published_state().await, MonitoringReporter::default());
    let body = get_json(app, "/api/report").await;
    assert_eq!(body["reports_published"], 1);
    assert_eq!(body["report"]["completeness"], "complete");
    assert_eq!(body["report"]["total_actions"], 0);
    assert_eq!(body["report"]["per_category"][3]["category"], "Pest Control");
}

#[tokio::test]
async fn zones_endpoint_returns_latest_rows() {
    let app = create_router(published_state().await, MonitoringReporter::default());
    let body = get_json(app, "/api/zones").await;

    let zones = body["zones"].as_array().unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["zone_id"], "Zone-B");
    assert_eq!(zones[0]["status"], "humidity_alert");
    assert_eq!(zones[0]["actuators"]["dehumidifier_active"], true);
    assert_eq!(zones[0]["humidity_range"]["max"], 85.0);
    assert!(body["last_update"].is_string());
}

#[tokio::test(start_paused = true)]
async fn monitoring_endpoint_tracks_window_phase() {
    let reporter = MonitoringReporter::default();
    let body = get_json(create_router(DashboardState::shared(), reporter.clone()), "/api/monitoring").await;
    assert_eq!(body["open"], false);
    assert_eq!(body["phase"]["state"], "idle");

    reporter.start_monitoring(Duration::from_secs(30));
    let body = get_json(create_router(DashboardState::shared(), reporter.clone()), "/api/monitoring").await;
    assert_eq!(body["open"], true);
    assert_eq!(body["phase"]["state"], "open");
    assert_eq!(body["phase"]["cycle"], 1);

    reporter.shutdown();
    let body = get_json(create_router(DashboardState::shared(), reporter), "/api/monitoring").await;
    assert_eq!(body["phase"]["state"], "shut_down");
}

#[tokio::test]
async fn health_check() {
    let app = create_router(DashboardState::shared(), MonitoringReporter::default());
    let body = get_json(app, "/health").await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}
