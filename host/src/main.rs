//! ==============================================================================
//! main.rs - greenhouse host entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the greenhouse together and runs it until ctrl-c (or for a
//!     configured number of seconds).
//!
//! responsibilities:
//!     - install the tracing subscriber and load greenhouse.toml
//!     - build the crop registry, reporter and simulated sensors
//!     - inject them into the climate, irrigation, light and pest loops
//!     - run continuous monitoring windows and publish each report
//!     - serve the read-only dashboard
//!     - shut everything down in order
//!
//! architecture:
//!
//!     ┌───────────────────────────────────────────────────────────────────┐
//!     │                        greenhouse host                            │
//!     │  ┌────────────┐   ┌──────────────────────────────┐  ┌───────────┐ │
//!     │  │ simulation │──►│ climate │ irrigation │ light │  │ web server│ │
//!     │  │ (10s walk) │   │         │   pest           │  │ (port 3000│ │
//!     │  └────────────┘   └──────────────┬───────────────┘  └─────▲─────┘ │
//!     │                                  │ record_action           │       │
//!     │                          ┌───────▼────────┐   reports ┌───┴─────┐ │
//!     │                          │    reporter    │──────────►│  state  │ │
//!     │                          │ (60s windows)  │           └─────────┘ │
//!     │                          └────────────────┘                       │
//!     └───────────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use anyhow::Result;
use greenhouse_host::config::{GreenhouseConfig, CONFIG_ENV};
use greenhouse_host::control::{HysteresisSettings, ZoneControlEngine};
use greenhouse_host::crops::CropRegistry;
use greenhouse_host::lifecycle::shutdown_channel;
use greenhouse_host::reporter::{run_report_cycles, MonitoringReporter, ReportCycleSettings};
use greenhouse_host::server::run_server;
use greenhouse_host::simulation::{run_climate_simulation, SimulatedGreenhouse};
use greenhouse_host::state::DashboardState;
use greenhouse_host::subsystems::{spawn_subsystems, SubsystemDeps};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

// ==============================================================================
// logging
// ==============================================================================
// RUST_LOG wins when set. otherwise start at info and switch to
// logging.level once the config file has been read.

fn init_tracing() -> reload::Handle<EnvFilter, Registry> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    handle
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let log_filter = init_tracing();

    // startup banner
    println!("===========================================================");
    println!("  Greenhouse Host - Environmental Control");
    println!("  climate | irrigation | light | pest | reports");
    println!("===========================================================");

    // step 1: load configuration
    let config = GreenhouseConfig::load_or_default();
    if std::env::var_os("RUST_LOG").is_none() {
        if let Err(e) = log_filter.reload(EnvFilter::new(&config.logging.level)) {
            warn!("[STARTUP] Could not apply log level {}: {}", config.logging.level, e);
        }
    }
    config.log_summary();
    info!("[STARTUP] Set {} to use a specific config file", CONFIG_ENV);

    // step 2: static zone/crop tables and shared state
    let crops = Arc::new(CropRegistry::from_config(&config));
    let state = DashboardState::shared();
    let reporter = MonitoringReporter::from_config(&config.reporting);
    let (trigger, shutdown) = shutdown_channel();

    // step 3: simulated sensors
    let sim = Arc::new(SimulatedGreenhouse::new(
        Arc::clone(&crops),
        config.logging.show_sensor_data,
    ));
    let mut tasks = vec![tokio::spawn(run_climate_simulation(
        Arc::clone(&sim),
        config.polling.sensor_update_interval(),
        shutdown.clone(),
    ))];
    info!("[STARTUP] ✓ Simulated sensors ready ({} zones)", crops.controlled_zones().count());

    // step 4: control loops
    let engine = ZoneControlEngine::new(Arc::clone(&crops), HysteresisSettings::from(&config.control))
        .with_stale_after(Duration::from_secs(config.control.stale_after_seconds));
    let deps = SubsystemDeps {
        crops,
        sink: Arc::new(reporter.clone()),
        climate: sim.clone(),
        soil: sim.clone(),
        light: sim.clone(),
        pests: sim,
    };
    tasks.extend(spawn_subsystems(deps, engine, &config, state.clone(), &shutdown));
    info!("[STARTUP] ✓ Control loops running");

    // step 5: continuous reporting
    tasks.push(tokio::spawn(run_report_cycles(
        reporter.clone(),
        ReportCycleSettings::from(&config.reporting),
        shutdown.clone(),
        state.clone(),
    )));

    // step 6: web server in background
    if config.server.enabled {
        let bind = config.server.bind.clone();
        let (web_state, web_reporter, web_shutdown) = (state.clone(), reporter.clone(), shutdown.clone());
        tasks.push(tokio::spawn(async move {
            if let Err(e) = run_server(&bind, web_state, web_reporter, web_shutdown).await {
                error!("[SERVER] Web server error: {:#}", e);
            }
        }));
    }

    // step 7: run until asked to stop
    wait_for_stop(config.runtime.run_for_seconds).await;

    info!("[SHUTDOWN] Stopping greenhouse host...");
    trigger.trigger();
    reporter.shutdown();
    for task in tasks {
        if let Err(e) = task.await {
            warn!("[SHUTDOWN] Task ended abnormally: {}", e);
        }
    }
    info!("[SHUTDOWN] ✓ All loops stopped");

    Ok(())
}

/// ctrl-c, or the configured run time if one is set
async fn wait_for_stop(run_for_seconds: u64) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("[RUNTIME] Failed to listen for ctrl-c: {}", e);
        }
    };

    if run_for_seconds == 0 {
        info!("[RUNTIME] Running until ctrl-c");
        ctrl_c.await;
        return;
    }

    info!("[RUNTIME] Running for {}s (ctrl-c to stop early)", run_for_seconds);
    tokio::select! {
        _ = ctrl_c => {}
        _ = tokio::time::sleep(Duration::from_secs(run_for_seconds)) => {
            info!("[RUNTIME] Configured run time elapsed");
        }
    }
}
