//! ==============================================================================
//! subsystems.rs - the periodic greenhouse control loops
//! ==============================================================================
//!
//! purpose:
//!     four independent loops, each a tokio task, each reporting what it did
//!     to the ActionSink under its own service category:
//!
//! ```text
//!     ┌──────────────┬──────┬──────────────────────────────┬───────────────────┐
//!     │ loop         │ every│ reads                        │ category          │
//!     ├──────────────┼──────┼──────────────────────────────┼───────────────────┤
//!     │ climate      │  5s  │ ClimateDataProvider          │ Climate Control   │
//!     │ irrigation   │ 20s  │ SoilMoistureProvider         │ Irrigation System │
//!     │ light        │ 30s  │ LightIntensityProvider       │ Light System      │
//!     │ pest         │ 30s  │ PestDetectionProvider        │ Pest Control      │
//!     └──────────────┴──────┴──────────────────────────────┴───────────────────┘
//! ```
//!
//! ```text
//!     each loop ticks once immediately, then sleeps its interval through the
//!     ShutdownSignal so ctrl-c interrupts the wait.
//! ```
//!
//! relationships:
//!     - uses: control.rs (climate decisions), providers.rs, reporter.rs (ActionSink)
//!     - writes: state.rs (zone status rows for the dashboard)
//!
//! ==============================================================================

use crate::config::{GreenhouseConfig, IrrigationConfig, LightConfig};
use crate::control::{CycleOutcome, ZoneControlEngine};
use crate::crops::CropRegistry;
use crate::domain::ServiceCategory;
use crate::lifecycle::ShutdownSignal;
use crate::providers::{
    ClimateDataProvider, LightIntensityProvider, PestDetection, PestDetectionProvider,
    SoilMoistureProvider,
};
use crate::report::render_zone_status;
use crate::reporter::ActionSink;
use crate::state::SharedState;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// everything the loops need, injected once at startup
#[derive(Clone)]
pub struct SubsystemDeps {
    pub crops: Arc<CropRegistry>,
    pub sink: Arc<dyn ActionSink>,
    pub climate: Arc<dyn ClimateDataProvider>,
    pub soil: Arc<dyn SoilMoistureProvider>,
    pub light: Arc<dyn LightIntensityProvider>,
    pub pests: Arc<dyn PestDetectionProvider>,
}

// ==============================================================================
// climate
// ==============================================================================

/// one climate cycle: evaluate every zone and record the toggles
pub fn climate_tick(
    engine: &mut ZoneControlEngine,
    provider: &dyn ClimateDataProvider,
    sink: &dyn ActionSink,
) -> CycleOutcome {
    let readings = provider.all_zones_climate_data();
    let outcome = engine.run_cycle(&readings);

    for action in &outcome.actions {
        info!("[CLIMATE] {} ({}): {}", action.zone_id, action.crop, action.description);
        sink.record_action(
            ServiceCategory::ClimateControl.label(),
            &format!("{} ({}): {}", action.zone_id, action.crop, action.description),
        );
    }
    outcome
}

pub async fn run_climate_loop(
    mut engine: ZoneControlEngine,
    provider: Arc<dyn ClimateDataProvider>,
    sink: Arc<dyn ActionSink>,
    state: SharedState,
    interval: Duration,
    mut shutdown: ShutdownSignal,
) {
    info!("[CLIMATE] Starting climate control ({}s interval)", interval.as_secs());

    while shutdown.is_running() {
        let outcome = climate_tick(&mut engine, provider.as_ref(), sink.as_ref());
        if !outcome.statuses.is_empty() {
            for line in render_zone_status(&outcome.statuses).lines() {
                info!("[CLIMATE] {}", line);
            }
            state.write().await.publish_zones(outcome.statuses);
        }

        if !shutdown.sleep(interval).await {
            break;
        }
    }

    info!("[CLIMATE] Climate control stopped");
}

// ==============================================================================
// irrigation
// ==============================================================================

pub fn irrigation_action(zone: &str, crop: &str, moisture: f64, threshold: f64) -> String {
    if moisture < threshold {
        format!("Irrigating {} ({}) - moisture: {:.2}%", zone, crop, moisture)
    } else {
        format!("Skipped irrigation for {} - moisture sufficient ({:.2}%)", zone, moisture)
    }
}

/// compare each zone's soil moisture to its crop threshold; returns zones irrigated
pub fn irrigation_tick(
    provider: &dyn SoilMoistureProvider,
    crops: &CropRegistry,
    config: &IrrigationConfig,
    sink: &dyn ActionSink,
) -> usize {
    let levels: BTreeMap<String, f64> = provider.soil_moisture_levels().into_iter().collect();
    let mut irrigated = 0;

    for (zone, moisture) in &levels {
        let Some(crop) = crops.crop_for_zone(zone) else {
            warn!("[IRRIGATION] Moisture reported for unknown zone {} - ignored", zone);
            continue;
        };
        let threshold = config.threshold_for(crop);
        if *moisture < threshold {
            irrigated += 1;
        }

        let action = irrigation_action(zone, crop, *moisture, threshold);
        debug!("[IRRIGATION] {}", action);
        sink.record_action(ServiceCategory::IrrigationSystem.label(), &action);
    }

    info!("[IRRIGATION] {} of {} zones irrigated", irrigated, levels.len());
    irrigated
}

// ==============================================================================
// light
// ==============================================================================

pub fn light_action(zone: &str, lux: u32, config: &LightConfig) -> String {
    if lux < config.low_lux {
        format!("Increased brightness in {} ({} lux)", zone, lux)
    } else if lux > config.high_lux {
        format!("Dimmed lights in {} ({} lux)", zone, lux)
    } else {
        format!("Maintained optimal lighting in {} ({} lux)", zone, lux)
    }
}

pub fn light_tick(provider: &dyn LightIntensityProvider, config: &LightConfig, sink: &dyn ActionSink) {
    let levels: BTreeMap<String, u32> = provider.light_intensity().into_iter().collect();
    if levels.is_empty() {
        warn!("[LIGHT] No light data available");
    }
    for (zone, lux) in levels {
        let action = light_action(&zone, lux, config);
        info!("[LIGHT] {}", action);
        sink.record_action(ServiceCategory::LightSystem.label(), &action);
    }
}

// ==============================================================================
// pest control
// ==============================================================================

pub fn pest_action(detection: &PestDetection) -> String {
    format!(
        "Deployed organic pesticides in {} ({}) against {}, reported by {}",
        detection.zone, detection.crop, detection.pest, detection.camera
    )
}

/// returns whether anything was detected
pub fn pest_tick(provider: &dyn PestDetectionProvider, sink: &dyn ActionSink) -> bool {
    match provider.detect_pests() {
        Some(detection) => {
            info!(
                "[PEST] {} detected in {} ({}) by {}",
                detection.pest, detection.zone, detection.crop, detection.camera
            );
            sink.record_action(ServiceCategory::PestControl.label(), &pest_action(&detection));
            true
        }
        None => {
            debug!("[PEST] No pests detected");
            false
        }
    }
}

// ==============================================================================
// scheduling
// ==============================================================================

/// run `tick` now and then every `interval` until shutdown
pub async fn run_periodic<F>(name: &'static str, interval: Duration, mut shutdown: ShutdownSignal, mut tick: F)
where
    F: FnMut() + Send,
{
    info!("[{}] Starting ({}s interval)", name, interval.as_secs());
    while shutdown.is_running() {
        tick();
        if !shutdown.sleep(interval).await {
            break;
        }
    }
    info!("[{}] Stopped", name);
}

/// spawn the four control loops
pub fn spawn_subsystems(
    deps: SubsystemDeps,
    engine: ZoneControlEngine,
    config: &GreenhouseConfig,
    state: SharedState,
    shutdown: &ShutdownSignal,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(4);

    handles.push(tokio::spawn(run_climate_loop(
        engine,
        Arc::clone(&deps.climate),
        Arc::clone(&deps.sink),
        state,
        config.polling.climate_interval(),
        shutdown.clone(),
    )));

    let (soil, crops, sink) = (Arc::clone(&deps.soil), Arc::clone(&deps.crops), Arc::clone(&deps.sink));
    let irrigation = config.irrigation.clone();
    handles.push(tokio::spawn(run_periodic(
        "IRRIGATION",
        config.polling.irrigation_interval(),
        shutdown.clone(),
        move || {
            irrigation_tick(soil.as_ref(), &crops, &irrigation, sink.as_ref());
        },
    )));

    let (light, sink) = (Arc::clone(&deps.light), Arc::clone(&deps.sink));
    let light_config = config.light.clone();
    handles.push(tokio::spawn(run_periodic(
        "LIGHT",
        config.polling.light_interval(),
        shutdown.clone(),
        move || light_tick(light.as_ref(), &light_config, sink.as_ref()),
    )));

    let (pests, sink) = (Arc::clone(&deps.pests), Arc::clone(&deps.sink));
    handles.push(tokio::spawn(run_periodic(
        "PEST",
        config.polling.pest_interval(),
        shutdown.clone(),
        move || {
            pest_tick(pests.as_ref(), sink.as_ref());
        },
    )));

    handles
}
