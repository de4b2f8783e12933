//! ==============================================================================
//! providers.rs - sensor data seams
//! ==============================================================================
//!
//! purpose:
//!     the control loops never talk to sensors directly. each kind of
//!     telemetry sits behind a small Send + Sync trait so the loops can be
//!     fed by the simulation, by real hardware, or by a fixed test double.
//!
//! relationships:
//!     - implemented by: simulation.rs
//!     - used by: subsystems.rs (injected as Arc<dyn ...>)
//!
//! ==============================================================================

use crate::domain::ZoneReading;
use serde::Serialize;
use std::collections::HashMap;

/// latest temperature/humidity reading per zone
pub trait ClimateDataProvider: Send + Sync {
    /// latest reading for every zone that has one; may be empty
    fn all_zones_climate_data(&self) -> HashMap<String, ZoneReading>;
    fn available_zones(&self) -> Vec<String>;
}

/// soil moisture (%) per zone
pub trait SoilMoistureProvider: Send + Sync {
    fn soil_moisture_levels(&self) -> HashMap<String, f64>;
}

/// light intensity (lux) per zone
pub trait LightIntensityProvider: Send + Sync {
    fn light_intensity(&self) -> HashMap<String, u32>;
}

/// camera-based pest detection; at most one sighting per poll
pub trait PestDetectionProvider: Send + Sync {
    fn detect_pests(&self) -> Option<PestDetection>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PestDetection {
    pub zone: String,
    pub crop: String,
    pub camera: String,
    pub pest: String,
}
