//! ==============================================================================
//! reporter.rs - windowed, concurrent action reporter
//! ==============================================================================
//!
//! purpose:
//!     collects action records from every subsystem while a monitoring window
//!     is open, and renders one consistent activity report per window.
//!
//! window phases:
//!
//! ```text
//!     Idle ──start_monitoring──► Open{cycle} ──timer──► Closed{cycle}
//!                                   ▲                       │
//!                                   └────start_monitoring───┘
//!     any phase ──shutdown──► ShutDown (terminal)
//! ```
//!
//! concurrency:
//!     - one std Mutex<Vec<ActionRecord>> per category, held only for a push
//!       or a clone. record_action never awaits.
//!     - the open flag is checked under the category lock, so nothing lands
//!       in a list after the window closed and the renderer took its snapshot.
//!     - the phase lives in a tokio watch channel. generate_report waits on it
//!       (bounded by the report timeout); shutdown moves it to ShutDown, which
//!       releases every waiter. publishing a phase twice is harmless.
//!
//! relationships:
//!     - used by: subsystems.rs (ActionSink), main.rs (run_report_cycles)
//!     - uses: report.rs (rendering, archive)
//!
//! ==============================================================================

use crate::config::ReportingConfig;
use crate::domain::{ActionRecord, ServiceCategory};
use crate::lifecycle::ShutdownSignal;
use crate::report::{archive_report, ActivityReport, CategorySection, Completeness};
use crate::state::SharedState;
use chrono::Local;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// how long generate_report waits for the window before giving up
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// accepts action records from producers
pub trait ActionSink: Send + Sync {
    /// record an action; unknown categories and closed windows drop it
    fn record_action(&self, category: &str, description: &str);
}

/// drives monitoring windows and report generation
pub trait ReportingControl {
    fn start_monitoring(&self, duration: Duration);
    fn generate_report(&self) -> impl Future<Output = String> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowPhase {
    Idle,
    Open { cycle: u64 },
    Closed { cycle: u64 },
    ShutDown,
}

impl WindowPhase {
    /// nothing more will be recorded in the current window
    pub fn is_settled(&self) -> bool {
        matches!(self, WindowPhase::Closed { .. } | WindowPhase::ShutDown)
    }
}

// ==============================================================================
// shared state
// ==============================================================================

struct ReporterInner {
    /// one list per category, in report order
    sections: Vec<(ServiceCategory, Mutex<Vec<ActionRecord>>)>,
    open: AtomicBool,
    /// cycle number of the latest window (0 = never started)
    cycle: AtomicU64,
    /// cycle number of the latest window whose timer completed
    closed_cycle: AtomicU64,
    phase: watch::Sender<WindowPhase>,
    timer: Mutex<Option<JoinHandle<()>>>,
    report_timeout: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking producer must not take reporting down with it
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReporterInner {
    fn section(&self, category: ServiceCategory) -> Option<&Mutex<Vec<ActionRecord>>> {
        self.sections
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, records)| records)
    }

    fn close_window(&self, cycle: u64) {
        let closed = self.phase.send_if_modified(|phase| {
            if *phase == (WindowPhase::Open { cycle }) {
                self.open.store(false, Ordering::Release);
                self.closed_cycle.store(cycle, Ordering::Release);
                *phase = WindowPhase::Closed { cycle };
                true
            } else {
                false
            }
        });
        if closed {
            info!("[REPORTER] ========= Monitoring period ended (cycle {}) =========", cycle);
        }
    }
}

/// clone-able handle; every clone shares the same window and records
#[derive(Clone)]
pub struct MonitoringReporter {
    inner: Arc<ReporterInner>,
}

impl Default for MonitoringReporter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_TIMEOUT)
    }
}

impl MonitoringReporter {
    pub fn new(report_timeout: Duration) -> Self {
        let sections = ServiceCategory::ALL
            .into_iter()
            .map(|category| (category, Mutex::new(Vec::new())))
            .collect();
        let (phase, _) = watch::channel(WindowPhase::Idle);

        Self {
            inner: Arc::new(ReporterInner {
                sections,
                open: AtomicBool::new(false),
                cycle: AtomicU64::new(0),
                closed_cycle: AtomicU64::new(0),
                phase,
                timer: Mutex::new(None),
                report_timeout,
            }),
        }
    }

    pub fn from_config(config: &ReportingConfig) -> Self {
        Self::new(config.report_timeout())
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> WindowPhase {
        *self.inner.phase.borrow()
    }

    /// record a typed action; returns whether it was accepted
    pub fn record(&self, category: ServiceCategory, description: impl Into<String>) -> bool {
        let Some(section) = self.inner.section(category) else {
            return false;
        };
        let mut records = lock(section);
        if !self.inner.open.load(Ordering::Acquire) {
            debug!("[REPORTER] Window closed - dropping {} action", category);
            return false;
        }

        let description = description.into();
        debug!("[REPORTER] Recorded: {} - {}", category, description);
        records.push(ActionRecord {
            category,
            description,
            recorded_at: Local::now(),
        });
        true
    }

    /// clear all records, open a new window and arm its close timer.
    /// must be called from inside a tokio runtime.
    pub fn start_monitoring(&self, duration: Duration) {
        let mut timer = lock(&self.inner.timer);
        if *self.inner.phase.borrow() == WindowPhase::ShutDown {
            warn!("[REPORTER] start_monitoring after shutdown - ignored");
            return;
        }
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        for (_, section) in &self.inner.sections {
            lock(section).clear();
        }

        let cycle = self.inner.cycle.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.phase.send_modify(|phase| {
            self.inner.open.store(true, Ordering::Release);
            *phase = WindowPhase::Open { cycle };
        });
        info!(
            "[REPORTER] ========= Started monitoring greenhouse systems for {}s (cycle {}) =========",
            duration.as_secs(),
            cycle
        );

        let inner = Arc::clone(&self.inner);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            inner.close_window(cycle);
        }));
    }

    /// resolves when the current window has closed or the reporter shut down
    pub async fn wait_for_window(&self) {
        let mut phase = self.inner.phase.subscribe();
        // the sender lives in self, so this cannot fail
        let _ = phase.wait_for(WindowPhase::is_settled).await.map(|_| ());
    }

    /// per-category copies of the accumulated records, in report order
    pub fn snapshot(&self) -> Vec<CategorySection> {
        self.inner
            .sections
            .iter()
            .map(|(category, records)| CategorySection {
                category: *category,
                records: lock(records).clone(),
            })
            .collect()
    }

    pub fn action_count(&self) -> usize {
        self.inner.sections.iter().map(|(_, r)| lock(r).len()).sum()
    }

    /// wait (bounded) for the window to close, then render the report
    pub async fn compile_report(&self) -> ActivityReport {
        let mut phase = self.inner.phase.subscribe();
        let waited = tokio::time::timeout(self.inner.report_timeout, async move {
            phase.wait_for(WindowPhase::is_settled).await.is_ok()
        })
        .await;

        if waited.is_err() {
            warn!("[REPORTER] Warning: Report generated before monitoring completed");
        }

        let cycle = self.inner.cycle.load(Ordering::Acquire);
        let window_completed =
            cycle != 0 && self.inner.closed_cycle.load(Ordering::Acquire) == cycle;
        let completeness = if waited.is_ok() && window_completed {
            Completeness::Complete
        } else {
            Completeness::Incomplete
        };

        ActivityReport::build(&self.snapshot(), Local::now(), completeness)
    }

    pub async fn generate_report(&self) -> String {
        self.compile_report().await.text
    }

    /// stop accepting records, release report waiters, cancel the timer.
    /// idempotent.
    pub fn shutdown(&self) {
        let mut timer = lock(&self.inner.timer);
        let changed = self.inner.phase.send_if_modified(|phase| {
            self.inner.open.store(false, Ordering::Release);
            if *phase == WindowPhase::ShutDown {
                false
            } else {
                *phase = WindowPhase::ShutDown;
                true
            }
        });
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        if changed {
            info!("[REPORTER] Reporter shut down");
        }
    }
}

impl ActionSink for MonitoringReporter {
    fn record_action(&self, category: &str, description: &str) {
        match category.parse::<ServiceCategory>() {
            Ok(category) => {
                self.record(category, description);
            }
            Err(e) => warn!("[REPORTER] Dropping action: {}", e),
        }
    }
}

impl ReportingControl for MonitoringReporter {
    fn start_monitoring(&self, duration: Duration) {
        MonitoringReporter::start_monitoring(self, duration);
    }

    fn generate_report(&self) -> impl Future<Output = String> + Send {
        MonitoringReporter::generate_report(self)
    }
}

// ==============================================================================
// continuous mode
// ==============================================================================

#[derive(Debug, Clone)]
pub struct ReportCycleSettings {
    pub window: Duration,
    pub pause: Duration,
    pub archive_dir: Option<PathBuf>,
}

impl From<&ReportingConfig> for ReportCycleSettings {
    fn from(config: &ReportingConfig) -> Self {
        Self {
            window: config.window(),
            pause: config.pause(),
            archive_dir: config.archive_dir.clone(),
        }
    }
}

/// open a window, wait for it, emit the report, pause, repeat until shutdown.
/// each report is printed, optionally archived and published to the dashboard.
pub async fn run_report_cycles(
    reporter: MonitoringReporter,
    settings: ReportCycleSettings,
    mut shutdown: ShutdownSignal,
    state: SharedState,
) {
    info!("[REPORTER] Continuous reporting: {}s windows", settings.window.as_secs());

    while shutdown.is_running() {
        reporter.start_monitoring(settings.window);
        if reporter.phase() == WindowPhase::ShutDown {
            break;
        }

        tokio::select! {
            _ = reporter.wait_for_window() => {}
            _ = shutdown.wait() => break,
        }

        let report = reporter.compile_report().await;
        println!("{}", report.text);

        if let Some(dir) = &settings.archive_dir {
            match archive_report(dir, &report).await {
                Ok(path) => info!("[REPORTER] Report saved as: {}", path.display()),
                Err(e) => warn!("[REPORTER] Error saving report: {:#}", e),
            }
        }
        state.write().await.publish_report(report);

        if !shutdown.sleep(settings.pause).await {
            break;
        }
    }

    info!("[REPORTER] Reporting loop stopped");
}
