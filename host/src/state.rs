//! ==============================================================================
//! state.rs - shared dashboard state
//! ==============================================================================
//!
//! this struct holds what the web server shows. it is shared between:
//! - the climate loop (writes the latest zone status rows)
//! - the report cycle (writes each finished report)
//! - the web server (reads for the api and the plain-text report)
//!
//! writers hold the lock only for a field swap; handlers clone what they
//! need and release it before building a response.
//!
//! ==============================================================================

use crate::control::ZoneStatusRow;
use crate::report::ActivityReport;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedState = Arc<RwLock<DashboardState>>;

#[derive(Clone, Debug, Default, Serialize)]
pub struct DashboardState {
    /// status rows from the most recent climate cycle
    pub zones: Vec<ZoneStatusRow>,
    /// most recently finished activity report
    pub latest_report: Option<ActivityReport>,
    pub reports_published: u64,
    /// when anything in here last changed
    pub last_update: Option<DateTime<Local>>,
}

impl DashboardState {
    pub fn shared() -> SharedState {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn publish_zones(&mut self, zones: Vec<ZoneStatusRow>) {
        self.zones = zones;
        self.last_update = Some(Local::now());
    }

    pub fn publish_report(&mut self, report: ActivityReport) {
        self.latest_report = Some(report);
        self.reports_published += 1;
        self.last_update = Some(Local::now());
    }
}
