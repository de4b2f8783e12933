//! ==============================================================================
//! greenhouse-host - greenhouse environmental control
//! ==============================================================================
//!
//! per-zone hysteresis climate control plus irrigation, lighting and pest
//! loops, all reporting into a windowed activity reporter.
//!
//! module map:
//!     domain       readings, ranges, crop profiles, service categories
//!     config       greenhouse.toml schema and loader
//!     crops        zone -> crop -> optimal range lookup
//!     control      hysteresis engine and zone status
//!     reporter     monitoring windows and concurrent action recording
//!     report       report text, zone table and archive files
//!     providers    sensor data traits
//!     simulation   random-walk sensor implementation
//!     subsystems   the four periodic control loops
//!     state        dashboard state shared with the web server
//!     server       read-only axum dashboard
//!     lifecycle    shutdown signalling
//!
//! ==============================================================================

pub mod config;
pub mod control;
pub mod crops;
pub mod domain;
pub mod lifecycle;
pub mod providers;
pub mod report;
pub mod reporter;
pub mod server;
pub mod simulation;
pub mod state;
pub mod subsystems;
