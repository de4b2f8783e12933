//! ==============================================================================
//! report.rs - activity report rendering
//! ==============================================================================
//!
//! purpose:
//!     turns the per-category action lists of one closed monitoring window
//!     into the textual activity report. rendering is a pure function of
//!     its inputs (the generation time is passed in, never read from a clock).
//!
//! layout:
//!     banner / Generated / [incomplete warning] / SUMMARY / DETAILED ACTIONS
//!     BY SERVICE (one block per category, fixed order) / footer banner
//!
//! relationships:
//!     - used by: reporter.rs (compile_report), subsystems.rs (zone table)
//!     - writes: <archive_dir>/Greenhouse_Report_<timestamp>.txt
//!
//! ==============================================================================

use crate::control::ZoneStatusRow;
use crate::domain::{ActionRecord, ServiceCategory};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

/// timestamps inside the report text
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// timestamp embedded in archive file names
pub const ARCHIVE_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const BANNER: &str = "=====================================================";
const RULE: &str = "------------------------";
const INCOMPLETE_WARNING: &str =
    "WARNING: Report generated before monitoring completed - actions may be missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// the monitoring window closed before rendering
    Complete,
    /// rendered after the wait timed out
    Incomplete,
}

/// the records one category accumulated during a window
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySection {
    pub category: ServiceCategory,
    pub records: Vec<ActionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub actions: usize,
}

/// a rendered report plus the numbers behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityReport {
    pub generated_at: DateTime<Local>,
    pub completeness: Completeness,
    pub total_actions: usize,
    pub per_category: Vec<CategoryCount>,
    pub text: String,
}

impl ActivityReport {
    pub fn build(
        sections: &[CategorySection],
        generated_at: DateTime<Local>,
        completeness: Completeness,
    ) -> Self {
        let per_category = sections
            .iter()
            .map(|s| CategoryCount {
                category: s.category.label().to_string(),
                actions: s.records.len(),
            })
            .collect::<Vec<_>>();
        let total_actions = per_category.iter().map(|c| c.actions).sum();

        Self {
            generated_at,
            completeness,
            total_actions,
            per_category,
            text: render_report(sections, generated_at, completeness),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completeness == Completeness::Complete
    }
}

// ==============================================================================
// text rendering
// ==============================================================================

struct ReportView<'a> {
    sections: &'a [CategorySection],
    generated_at: DateTime<Local>,
    completeness: Completeness,
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", BANNER)?;
        writeln!(f, "       GREENHOUSE SYSTEM ACTIVITY REPORT")?;
        writeln!(f, "{}", BANNER)?;
        writeln!(f, "Generated: {}", self.generated_at.format(TIMESTAMP_FORMAT))?;
        if self.completeness == Completeness::Incomplete {
            writeln!(f, "{}", INCOMPLETE_WARNING)?;
        }
        writeln!(f)?;

        let total: usize = self.sections.iter().map(|s| s.records.len()).sum();
        writeln!(f, "SUMMARY:")?;
        writeln!(f, "Total actions recorded: {}", total)?;
        for section in self.sections {
            writeln!(f, "- {}: {} actions", section.category, section.records.len())?;
        }

        writeln!(f)?;
        writeln!(f, "DETAILED ACTIONS BY SERVICE:")?;
        for section in self.sections {
            writeln!(f)?;
            writeln!(f, "{}:", section.category)?;
            writeln!(f, "{}", RULE)?;
            if section.records.is_empty() {
                writeln!(f, "No actions recorded during monitoring period.")?;
            }
            for (i, record) in section.records.iter().enumerate() {
                writeln!(
                    f,
                    "{}. {} [{}]",
                    i + 1,
                    record.description,
                    record.recorded_at.format(TIMESTAMP_FORMAT)
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", BANNER)?;
        writeln!(f, "                 END OF REPORT")?;
        writeln!(f, "{}", BANNER)
    }
}

/// render the activity report text; deterministic for identical input
pub fn render_report(
    sections: &[CategorySection],
    generated_at: DateTime<Local>,
    completeness: Completeness,
) -> String {
    ReportView { sections, generated_at, completeness }.to_string()
}

/// fixed-width per-zone status table for the climate loop's console output
pub fn render_zone_status(rows: &[ZoneStatusRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<10} {:>9} {:<11} {:>12} {:<11} {}",
        "ZONE", "CROP", "TEMP (°C)", "OPTIMAL", "HUMIDITY (%)", "OPTIMAL", "STATUS"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:>9.1} {:<11} {:>12.1} {:<11} {}",
            row.zone_id,
            row.crop,
            row.temperature,
            row.temp_range.to_string(),
            row.humidity,
            row.humidity_range.to_string(),
            row.status.label()
        );
    }
    out
}

pub fn archive_file_name(generated_at: DateTime<Local>) -> String {
    format!("Greenhouse_Report_{}.txt", generated_at.format(ARCHIVE_STAMP_FORMAT))
}

/// write the report text under `dir`, creating it if needed
pub async fn archive_report(dir: &Path, report: &ActivityReport) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;

    let path = dir.join(archive_file_name(report.generated_at));
    tokio::fs::write(&path, &report.text)
        .await
        .with_context(|| format!("failed to write report {}", path.display()))?;

    Ok(path)
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ZoneStatus;
    use crate::domain::{Range, ZoneActuatorState};
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, h, m, s).unwrap()
    }

    fn record(category: ServiceCategory, description: &str, when: DateTime<Local>) -> ActionRecord {
        ActionRecord {
            category,
            description: description.to_string(),
            recorded_at: when,
        }
    }

    fn sections() -> Vec<CategorySection> {
        ServiceCategory::ALL
            .into_iter()
            .map(|category| {
                let records = match category {
                    ServiceCategory::ClimateControl => vec![
                        record(category, "Zone-A: Activating cooling system", at(9, 0, 5)),
                        record(category, "Zone-C: Activating humidifier", at(9, 0, 10)),
                    ],
                    ServiceCategory::LightSystem => {
                        vec![record(category, "Dimmed lights in Zone-B (812 lux)", at(9, 0, 30))]
                    }
                    _ => Vec::new(),
                };
                CategorySection { category, records }
            })
            .collect()
    }

    #[test]
    fn test_render_layout() {
        let text = render_report(&sections(), at(9, 1, 0), Completeness::Complete);

        let expected = "
=====================================================
       GREENHOUSE SYSTEM ACTIVITY REPORT
=====================================================
Generated: 2026-10-19 09:01:00

SUMMARY:
Total actions recorded: 3
- Climate Control: 2 actions
- Light System: 1 actions
- Irrigation System: 0 actions
- Pest Control: 0 actions

DETAILED ACTIONS BY SERVICE:

Climate Control:
------------------------
1. Zone-A: Activating cooling system [2026-10-19 09:00:05]
2. Zone-C: Activating humidifier [2026-10-19 09:00:10]

Light System:
------------------------
1. Dimmed lights in Zone-B (812 lux) [2026-10-19 09:00:30]

Irrigation System:
------------------------
No actions recorded during monitoring period.

Pest Control:
------------------------
No actions recorded during monitoring period.

=====================================================
                 END OF REPORT
=====================================================
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render_report(&sections(), at(9, 1, 0), Completeness::Complete);
        let b = render_report(&sections(), at(9, 1, 0), Completeness::Complete);
        assert_eq!(a, b);
    }

    #[test]
    fn test_incomplete_banner() {
        let text = render_report(&sections(), at(9, 1, 0), Completeness::Incomplete);
        assert!(text.contains(INCOMPLETE_WARNING));
        assert!(text.contains("SUMMARY:"));
        assert!(text.contains("END OF REPORT"));

        let complete = render_report(&sections(), at(9, 1, 0), Completeness::Complete);
        assert!(!complete.contains("WARNING"));
    }

    #[test]
    fn test_counts_are_conserved() {
        let report = ActivityReport::build(&sections(), at(9, 1, 0), Completeness::Complete);
        assert_eq!(report.total_actions, 3);
        assert_eq!(
            report.per_category.iter().map(|c| c.actions).sum::<usize>(),
            report.total_actions
        );
        assert_eq!(report.per_category[1].category, "Light System");
        assert!(report.is_complete());
    }

    #[test]
    fn test_zone_status_table() {
        let rows = vec![ZoneStatusRow {
            zone_id: "Zone-A".to_string(),
            crop: "Tomatoes".to_string(),
            temperature: 28.04,
            humidity: 70.0,
            temp_range: Range::new(21.0, 27.0),
            humidity_range: Range::new(65.0, 80.0),
            status: ZoneStatus::TemperatureAlert,
            actuators: ZoneActuatorState::default(),
        }];
        let table = render_zone_status(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ZONE"));
        assert!(lines[1].starts_with("Zone-A   Tomatoes"));
        assert!(lines[1].contains("28.0"));
        assert!(lines[1].contains("21.0-27.0"));
        assert!(lines[1].ends_with("TEMP ALERT"));
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name(at(14, 3, 22)), "Greenhouse_Report_2026-10-19_14-03-22.txt");
    }

    #[tokio::test]
    async fn test_archive_writes_report_text() {
        let dir = std::env::temp_dir().join(format!("greenhouse-archive-{}", std::process::id()));
        let report = ActivityReport::build(&sections(), at(9, 1, 0), Completeness::Complete);

        let path = archive_report(&dir, &report).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, report.text);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
