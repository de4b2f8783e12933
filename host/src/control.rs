//! ==============================================================================
//! control.rs - per-zone hysteresis climate control
//! ==============================================================================
//!
//! purpose:
//!     turns noisy periodic zone readings into stable actuator state.
//!     each zone owns one ZoneActuatorState; a reading only ever touches the
//!     state of its own zone, so zones never share mutable state.
//!
//! the band for one axis (temperature shown, humidity is identical):
//!
//! ```text
//!        tLow          tMin                  tMax          tHigh
//!     ────┼─────────────┼─────────────────────┼─────────────┼────
//!   force heat ON   heat ON if off     (no action)   cool ON if off   force cool ON
//!   force cool OFF                                                   force heat OFF
//! ```
//!
//! ```text
//!     tLow = tMin - buffer, tHigh = tMax + buffer.
//!     inside [tMin, tMax] nothing is switched off (OuterBoundOnly), so a
//!     reading wobbling around tMax cannot chatter the cooler.
//! ```
//!
//! relationships:
//!     - used by: subsystems.rs (climate loop), server.rs (status rows)
//!     - uses: crops.rs (zone -> crop profile)
//!
//! ==============================================================================

use crate::config::ControlConfig;
use crate::crops::CropRegistry;
use crate::domain::{CropProfile, Range, ZoneActuatorState, ZoneReading};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// what happens when a reading comes back inside the optimal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShutoffPolicy {
    /// actuators stay on until the opposite outer bound forces them off
    #[default]
    OuterBoundOnly,
    /// both actuators of an axis turn off as soon as the value is back in [min, max]
    ReleaseInRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisSettings {
    pub temperature_buffer: f64,
    pub humidity_buffer: f64,
    pub policy: ShutoffPolicy,
}

impl Default for HysteresisSettings {
    fn default() -> Self {
        Self {
            temperature_buffer: 2.0,
            humidity_buffer: 5.0,
            policy: ShutoffPolicy::OuterBoundOnly,
        }
    }
}

impl From<&ControlConfig> for HysteresisSettings {
    fn from(config: &ControlConfig) -> Self {
        Self {
            temperature_buffer: config.temperature_buffer,
            humidity_buffer: config.humidity_buffer,
            policy: config.shutoff_policy,
        }
    }
}

// ==============================================================================
// single-zone evaluation
// ==============================================================================

/// device names on the low and high side of one axis
struct AxisDevices {
    low: &'static str,
    high: &'static str,
}

const TEMPERATURE_DEVICES: AxisDevices = AxisDevices {
    low: "heating system",
    high: "cooling system",
};

const HUMIDITY_DEVICES: AxisDevices = AxisDevices {
    low: "humidifier",
    high: "dehumidifier",
};

fn switch(active: &mut bool, on: bool, device: &str, actions: &mut Vec<String>) {
    if *active != on {
        *active = on;
        let verb = if on { "Activating" } else { "Deactivating" };
        actions.push(format!("{} {}", verb, device));
    }
}

#[allow(clippy::too_many_arguments)]
fn control_axis(
    value: f64,
    optimal: Range,
    buffer: f64,
    policy: ShutoffPolicy,
    low_active: &mut bool,
    high_active: &mut bool,
    devices: &AxisDevices,
    actions: &mut Vec<String>,
) {
    let outer = optimal.widen(buffer);

    if value < outer.min {
        switch(low_active, true, devices.low, actions);
        switch(high_active, false, devices.high, actions);
    } else if value > outer.max {
        switch(high_active, true, devices.high, actions);
        switch(low_active, false, devices.low, actions);
    } else if value < optimal.min && !*low_active {
        switch(low_active, true, devices.low, actions);
    } else if value > optimal.max && !*high_active {
        switch(high_active, true, devices.high, actions);
    } else if policy == ShutoffPolicy::ReleaseInRange && optimal.contains(value) {
        switch(high_active, false, devices.high, actions);
        switch(low_active, false, devices.low, actions);
    }
}

/// evaluate one reading against its crop profile, mutating the zone's state.
/// returns the comma-joined toggles performed, or None when nothing changed.
pub fn evaluate_zone(
    reading: &ZoneReading,
    profile: &CropProfile,
    state: &mut ZoneActuatorState,
    settings: &HysteresisSettings,
) -> Option<String> {
    let mut actions = Vec::new();

    control_axis(
        reading.temperature,
        profile.temp_range,
        settings.temperature_buffer,
        settings.policy,
        &mut state.heating_active,
        &mut state.cooling_active,
        &TEMPERATURE_DEVICES,
        &mut actions,
    );
    control_axis(
        reading.humidity,
        profile.humidity_range,
        settings.humidity_buffer,
        settings.policy,
        &mut state.humidifier_active,
        &mut state.dehumidifier_active,
        &HUMIDITY_DEVICES,
        &mut actions,
    );

    if actions.is_empty() {
        None
    } else {
        Some(actions.join(", "))
    }
}

// ==============================================================================
// zone status - reading vs optimal range, for the status table
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Normal,
    TemperatureAlert,
    HumidityAlert,
    TemperatureAndHumidityAlert,
}

impl ZoneStatus {
    pub fn assess(reading: &ZoneReading, profile: &CropProfile) -> Self {
        let temp_ok = profile.temp_range.contains(reading.temperature);
        let humidity_ok = profile.humidity_range.contains(reading.humidity);
        match (temp_ok, humidity_ok) {
            (true, true) => ZoneStatus::Normal,
            (false, true) => ZoneStatus::TemperatureAlert,
            (true, false) => ZoneStatus::HumidityAlert,
            (false, false) => ZoneStatus::TemperatureAndHumidityAlert,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ZoneStatus::Normal => "NORMAL",
            ZoneStatus::TemperatureAlert => "TEMP ALERT",
            ZoneStatus::HumidityAlert => "HUMIDITY ALERT",
            ZoneStatus::TemperatureAndHumidityAlert => "TEMP & HUMIDITY ALERT",
        }
    }
}

/// one line of the per-zone status table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStatusRow {
    pub zone_id: String,
    pub crop: String,
    pub temperature: f64,
    pub humidity: f64,
    pub temp_range: Range,
    pub humidity_range: Range,
    pub status: ZoneStatus,
    pub actuators: ZoneActuatorState,
}

/// a zone whose actuators changed this cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneAction {
    pub zone_id: String,
    pub crop: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneEvaluation {
    pub action: Option<ZoneAction>,
    pub status: ZoneStatusRow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleOutcome {
    pub actions: Vec<ZoneAction>,
    pub statuses: Vec<ZoneStatusRow>,
    /// zones with a reading but no crop profile
    pub unmapped: Vec<String>,
    /// zones whose reading was too old to act on
    pub stale: Vec<String>,
    /// controlled zones that produced no reading this cycle
    pub missing: Vec<String>,
}

// ==============================================================================
// engine - owns every zone's actuator state
// ==============================================================================

pub struct ZoneControlEngine {
    crops: Arc<CropRegistry>,
    settings: HysteresisSettings,
    stale_after: Option<chrono::Duration>,
    zones: BTreeMap<String, ZoneActuatorState>,
}

impl ZoneControlEngine {
    pub fn new(crops: Arc<CropRegistry>, settings: HysteresisSettings) -> Self {
        let zones = crops
            .controlled_zones()
            .map(|zone| (zone.to_string(), ZoneActuatorState::default()))
            .collect();

        Self {
            crops,
            settings,
            stale_after: None,
            zones,
        }
    }

    /// treat readings older than `max_age` as missing
    pub fn with_stale_after(mut self, max_age: Duration) -> Self {
        self.stale_after = chrono::Duration::from_std(max_age).ok();
        self
    }

    pub fn settings(&self) -> &HysteresisSettings {
        &self.settings
    }

    pub fn state(&self, zone_id: &str) -> Option<&ZoneActuatorState> {
        self.zones.get(zone_id)
    }

    pub fn states(&self) -> impl Iterator<Item = (&str, &ZoneActuatorState)> {
        self.zones.iter().map(|(zone, state)| (zone.as_str(), state))
    }

    /// evaluate one reading; None when the zone has no crop profile
    pub fn evaluate(&mut self, reading: &ZoneReading) -> Option<ZoneEvaluation> {
        let Some(profile) = self.crops.profile_for_zone(&reading.zone_id) else {
            warn!("[CONTROL] {} has no crop profile - skipping", reading.zone_id);
            return None;
        };

        let state = self.zones.entry(reading.zone_id.clone()).or_default();
        let description = evaluate_zone(reading, profile, state, &self.settings);

        let action = description.map(|description| ZoneAction {
            zone_id: reading.zone_id.clone(),
            crop: profile.crop_name.clone(),
            description,
        });
        let status = ZoneStatusRow {
            zone_id: reading.zone_id.clone(),
            crop: profile.crop_name.clone(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            temp_range: profile.temp_range,
            humidity_range: profile.humidity_range,
            status: ZoneStatus::assess(reading, profile),
            actuators: *state,
        };

        Some(ZoneEvaluation { action, status })
    }

    pub fn run_cycle(&mut self, readings: &HashMap<String, ZoneReading>) -> CycleOutcome {
        self.run_cycle_at(readings, Local::now())
    }

    /// evaluate every reading in zone-id order as of `now`
    pub fn run_cycle_at(
        &mut self,
        readings: &HashMap<String, ZoneReading>,
        now: DateTime<Local>,
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        if readings.is_empty() {
            warn!("[CONTROL] No climate data available - skipping cycle");
            return outcome;
        }

        let ordered: BTreeMap<&str, &ZoneReading> =
            readings.iter().map(|(zone, r)| (zone.as_str(), r)).collect();

        for (zone, reading) in ordered {
            if let Some(max_age) = self.stale_after {
                if now - reading.observed_at > max_age {
                    warn!("[CONTROL] Reading for {} is stale ({}) - skipping", zone, reading.observed_at);
                    outcome.stale.push(zone.to_string());
                    continue;
                }
            }

            match self.evaluate(reading) {
                Some(evaluation) => {
                    outcome.actions.extend(evaluation.action);
                    outcome.statuses.push(evaluation.status);
                }
                None => outcome.unmapped.push(zone.to_string()),
            }
        }

        outcome.missing = self
            .zones
            .keys()
            .filter(|zone| !readings.contains_key(zone.as_str()))
            .cloned()
            .collect();
        if !outcome.missing.is_empty() {
            debug!("[CONTROL] No update this cycle for {:?}", outcome.missing);
        }

        outcome
    }
}
