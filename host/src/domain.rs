use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// one climate sample for one zone
/// superseded by the next reading for the same zone, never mutated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneReading {
    /// zone identifier (e.g., "Zone-A")
    pub zone_id: String,
    /// temperature in celsius
    pub temperature: f64,
    /// relative humidity (0-100%)
    pub humidity: f64,
    /// when the sensor produced this sample
    pub observed_at: DateTime<Local>,
}

impl ZoneReading {
    pub fn new(zone_id: impl Into<String>, temperature: f64, humidity: f64) -> Self {
        Self {
            zone_id: zone_id.into(),
            temperature,
            humidity,
            observed_at: Local::now(),
        }
    }
}

impl fmt::Display for ZoneReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - Temperature: {:.1}°C, Humidity: {:.1}%",
            self.zone_id, self.temperature, self.humidity
        )
    }
}

/// closed interval [min, max]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// widen both ends by `buffer`
    pub fn widen(&self, buffer: f64) -> Self {
        Self::new(self.min - buffer, self.max + buffer)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}-{:.1}", self.min, self.max)
    }
}

/// optimal growing conditions for a crop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub crop_name: String,
    pub temp_range: Range,
    pub humidity_range: Range,
}

/// on/off status of one zone's climate devices
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ZoneActuatorState {
    pub cooling_active: bool,
    pub heating_active: bool,
    pub humidifier_active: bool,
    pub dehumidifier_active: bool,
}

// ==============================================================================
// service categories
// ==============================================================================
// every subsystem that reports to the monitoring window has a category.
// the order of ALL is the order categories appear in the rendered report.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ServiceCategory {
    ClimateControl,
    LightSystem,
    IrrigationSystem,
    PestControl,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::ClimateControl,
        ServiceCategory::LightSystem,
        ServiceCategory::IrrigationSystem,
        ServiceCategory::PestControl,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ServiceCategory::ClimateControl => "Climate Control",
            ServiceCategory::LightSystem => "Light System",
            ServiceCategory::IrrigationSystem => "Irrigation System",
            ServiceCategory::PestControl => "Pest Control",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown service category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for ServiceCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// a timestamped control decision taken by some subsystem
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionRecord {
    pub category: ServiceCategory,
    pub description: String,
    pub recorded_at: DateTime<Local>,
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for category in ServiceCategory::ALL {
            assert_eq!(category.label().parse::<ServiceCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let err = "Ventilation".parse::<ServiceCategory>().unwrap_err();
        assert_eq!(err, UnknownCategory("Ventilation".to_string()));
        // labels are matched exactly
        assert!("climate control".parse::<ServiceCategory>().is_err());
    }

    #[test]
    fn test_range_widen_and_contains() {
        let optimal = Range::new(21.0, 27.0);
        let outer = optimal.widen(2.0);
        assert_eq!(outer, Range::new(19.0, 29.0));
        assert!(optimal.contains(21.0));
        assert!(optimal.contains(27.0));
        assert!(!optimal.contains(27.01));
    }

    #[test]
    fn test_reading_display() {
        let reading = ZoneReading::new("Zone-A", 23.456, 70.04);
        assert_eq!(reading.to_string(), "Zone-A - Temperature: 23.5°C, Humidity: 70.0%");
    }
}
