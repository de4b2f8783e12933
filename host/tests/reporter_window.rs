//! Monitoring window behaviour seen from the producers' and the report
//! consumer's side.

use greenhouse_host::domain::ServiceCategory;
use greenhouse_host::report::Completeness;
use greenhouse_host::reporter::{ActionSink, MonitoringReporter, ReportingControl, WindowPhase};
use std::sync::Arc;
use std::time::Duration;

const CATEGORIES: [&str; 4] = ["Climate Control", "Light System", "Irrigation System", "Pest Control"];

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_producers_lose_nothing() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 250;

    let reporter = MonitoringReporter::default();
    reporter.start_monitoring(Duration::from_secs(600));

    std::thread::scope(|scope| {
        for p in 0..PRODUCERS {
            let reporter = &reporter;
            scope.spawn(move || {
                for i in 0..PER_PRODUCER {
                    let category = CATEGORIES[(p + i) % CATEGORIES.len()];
                    reporter.record_action(category, &format!("producer {} action {}", p, i));
                }
            });
        }
    });

    assert_eq!(reporter.action_count(), PRODUCERS * PER_PRODUCER);
    let sections = reporter.snapshot();
    for section in &sections {
        assert_eq!(section.records.len(), PRODUCERS * PER_PRODUCER / CATEGORIES.len());
    }
    reporter.shutdown();
}

#[tokio::test(start_paused = true)]
async fn records_outside_the_window_never_reach_a_report() {
    let reporter = MonitoringReporter::default();

    reporter.record_action("Light System", "before any window");
    reporter.start_monitoring(Duration::from_secs(60));
    reporter.record_action("Light System", "Dimmed lights in Zone-B (812 lux)");

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(reporter.phase(), WindowPhase::Closed { cycle: 1 });
    reporter.record_action("Light System", "after close");

    let report = reporter.compile_report().await;
    assert!(report.is_complete());
    assert_eq!(report.total_actions, 1);
    assert!(report.text.contains("Dimmed lights in Zone-B (812 lux)"));
    assert!(!report.text.contains("before any window"));
    assert!(!report.text.contains("after close"));

    // the next window starts empty
    reporter.start_monitoring(Duration::from_secs(60));
    assert_eq!(reporter.action_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn report_during_open_window_times_out_and_is_flagged() {
    let reporter = MonitoringReporter::new(Duration::from_secs(5));
    reporter.start_monitoring(Duration::from_secs(60));
    reporter.record(ServiceCategory::PestControl, "Deployed organic pesticides in Zone-C");

    let started = tokio::time::Instant::now();
    let report = reporter.compile_report().await;

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(report.completeness, Completeness::Incomplete);
    assert!(report.text.contains("WARNING: Report generated before monitoring completed"));
    assert!(report.text.contains("END OF REPORT"));
    assert_eq!(report.total_actions, 1);
    // the window itself is unaffected
    assert!(reporter.is_open());
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_a_waiting_report() {
    let reporter = MonitoringReporter::new(Duration::from_secs(3600));
    reporter.start_monitoring(Duration::from_secs(3600));
    reporter.record(ServiceCategory::ClimateControl, "Zone-A (Tomatoes): Activating cooling system");

    let waiter = {
        let reporter = reporter.clone();
        tokio::spawn(async move { reporter.compile_report().await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!waiter.is_finished());

    let started = tokio::time::Instant::now();
    reporter.shutdown();
    let report = waiter.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    // the window was cut short
    assert_eq!(report.completeness, Completeness::Incomplete);
    assert_eq!(report.total_actions, 1);
    assert!(!reporter.is_open());
}

#[tokio::test(start_paused = true)]
async fn reporting_control_through_trait_objects() {
    let reporter = MonitoringReporter::default();
    let sink: Arc<dyn ActionSink> = Arc::new(reporter.clone());

    ReportingControl::start_monitoring(&reporter, Duration::from_secs(2));
    sink.record_action("Irrigation System", "Irrigating Zone-D (Lettuce) - moisture: 41.20%");
    sink.record_action("Fertigation", "not a known service");

    tokio::time::sleep(Duration::from_secs(3)).await;
    let text = ReportingControl::generate_report(&reporter).await;

    assert!(text.contains("Total actions recorded: 1"));
    assert!(text.contains("- Irrigation System: 1 actions"));
    assert!(text.contains("1. Irrigating Zone-D (Lettuce) - moisture: 41.20%"));
    assert!(!text.contains("Fertigation"));
    assert!(!text.contains("WARNING"));
}
