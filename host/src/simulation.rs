//! ==============================================================================
//! simulation.rs - simulated greenhouse telemetry
//! ==============================================================================
//!
//! purpose:
//!     stands in for the sensor network when no hardware is attached.
//!     implements every provider trait so the control loops run unchanged.
//!
//! behaviour:
//!     - climate: each zone starts somewhere inside its crop's optimal range
//!       and then random-walks (±0.4 °C, ±1.0 %RH per step). one step in
//!       twenty adds a weather event: sunny (+2.0 °C, -4 %RH) or rainy
//!       (-1.5 °C, +6 %RH). humidity is clamped to 0-100.
//!     - soil moisture: uniform 20-80 % on every poll.
//!     - light: uniform 0-999 lux per zone on every poll.
//!     - pests: a random zone, one of five cameras and one known pest.
//!
//! relationships:
//!     - implements: providers.rs traits
//!     - uses: crops.rs (zones and their optimal ranges)
//!
//! ==============================================================================

use crate::crops::CropRegistry;
use crate::domain::ZoneReading;
use crate::lifecycle::ShutdownSignal;
use crate::providers::{
    ClimateDataProvider, LightIntensityProvider, PestDetection, PestDetectionProvider,
    SoilMoistureProvider,
};
use chrono::Local;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{info, warn};

const TEMPERATURE_STEP: f64 = 0.4;
const HUMIDITY_STEP: f64 = 1.0;
const WEATHER_EVENT_CHANCE: f64 = 0.05;

const CAMERAS: [&str; 5] = ["Camera-1", "Camera-2", "Camera-3", "Camera-4", "Camera-5"];

const PESTS: [&str; 20] = [
    "Aphids",
    "Whiteflies",
    "Spider Mites",
    "Mealybugs",
    "Leafhoppers",
    "Thrips",
    "Scale insects",
    "Ants",
    "Caterpillars",
    "Root-Knot Nematodes",
    "Flea Beetles",
    "Cutworms",
    "Japanese Beetles",
    "Leaf Miners",
    "Squash Bugs",
    "Colorado Potato Beetles",
    "White Grubs",
    "Stink Bugs",
    "Red Palm Weevil larvae",
    "Tomato Hornworms",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weather {
    Sunny,
    Rainy,
}

impl Weather {
    /// (temperature delta, humidity delta)
    fn shift(self) -> (f64, f64) {
        match self {
            Weather::Sunny => (2.0, -4.0),
            Weather::Rainy => (-1.5, 6.0),
        }
    }
}

/// one random-walk step; returns the new (temperature, humidity)
pub fn drift<R: Rng>(
    temperature: f64,
    humidity: f64,
    weather: Option<Weather>,
    rng: &mut R,
) -> (f64, f64) {
    let (mut dt, mut dh) = (
        rng.random_range(-TEMPERATURE_STEP..=TEMPERATURE_STEP),
        rng.random_range(-HUMIDITY_STEP..=HUMIDITY_STEP),
    );
    if let Some(weather) = weather {
        let (wt, wh) = weather.shift();
        dt += wt;
        dh += wh;
    }
    (temperature + dt, (humidity + dh).clamp(0.0, 100.0))
}

fn roll_weather<R: Rng>(rng: &mut R) -> Option<Weather> {
    if !rng.random_bool(WEATHER_EVENT_CHANCE) {
        return None;
    }
    Some(if rng.random_bool(0.5) { Weather::Sunny } else { Weather::Rainy })
}

pub struct SimulatedGreenhouse {
    crops: Arc<CropRegistry>,
    climate: RwLock<HashMap<String, ZoneReading>>,
    show_sensor_data: bool,
}

impl SimulatedGreenhouse {
    /// seed every controlled zone with a reading inside its optimal range
    pub fn new(crops: Arc<CropRegistry>, show_sensor_data: bool) -> Self {
        let mut rng = rand::rng();
        let climate = crops
            .controlled_zones()
            .filter_map(|zone| {
                let profile = crops.profile_for_zone(zone)?;
                let t = profile.temp_range;
                let h = profile.humidity_range;
                let reading = ZoneReading::new(
                    zone,
                    t.min + rng.random::<f64>() * (t.max - t.min),
                    h.min + rng.random::<f64>() * (h.max - h.min),
                );
                Some((zone.to_string(), reading))
            })
            .collect();

        Self {
            crops,
            climate: RwLock::new(climate),
            show_sensor_data,
        }
    }

    /// advance every zone by one random-walk step
    pub fn step(&self) {
        let mut rng = rand::rng();
        let mut climate = self.climate.write().unwrap_or_else(PoisonError::into_inner);

        for reading in climate.values_mut() {
            let weather = roll_weather(&mut rng);
            if let Some(weather) = weather {
                info!("[SENSOR] Weather event in {}: {:?}", reading.zone_id, weather);
            }
            let (temperature, humidity) =
                drift(reading.temperature, reading.humidity, weather, &mut rng);
            *reading = ZoneReading {
                zone_id: reading.zone_id.clone(),
                temperature,
                humidity,
                observed_at: Local::now(),
            };

            if self.show_sensor_data {
                info!("[SENSOR] {}", reading);
            }
            if let Some(profile) = self.crops.profile_for_zone(&reading.zone_id) {
                if !profile.temp_range.contains(temperature) {
                    warn!(
                        "[SENSOR] {} temperature {:.1}°C outside optimal {}",
                        reading.zone_id, temperature, profile.temp_range
                    );
                }
                if !profile.humidity_range.contains(humidity) {
                    warn!(
                        "[SENSOR] {} humidity {:.1}% outside optimal {}",
                        reading.zone_id, humidity, profile.humidity_range
                    );
                }
            }
        }
    }
}

impl ClimateDataProvider for SimulatedGreenhouse {
    fn all_zones_climate_data(&self) -> HashMap<String, ZoneReading> {
        self.climate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn available_zones(&self) -> Vec<String> {
        let mut zones: Vec<String> = self
            .climate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        zones.sort();
        zones
    }
}

impl SoilMoistureProvider for SimulatedGreenhouse {
    fn soil_moisture_levels(&self) -> HashMap<String, f64> {
        let mut rng = rand::rng();
        self.crops
            .zone_ids()
            .map(|zone| (zone.to_string(), rng.random_range(20.0..80.0)))
            .collect()
    }
}

impl LightIntensityProvider for SimulatedGreenhouse {
    fn light_intensity(&self) -> HashMap<String, u32> {
        let mut rng = rand::rng();
        self.crops
            .zone_ids()
            .map(|zone| (zone.to_string(), rng.random_range(0..1000)))
            .collect()
    }
}

impl PestDetectionProvider for SimulatedGreenhouse {
    fn detect_pests(&self) -> Option<PestDetection> {
        let mut rng = rand::rng();
        let zones: Vec<&str> = self.crops.zone_ids().collect();
        let zone = *zones.choose(&mut rng)?;

        Some(PestDetection {
            zone: zone.to_string(),
            crop: self.crops.crop_for_zone(zone)?.to_string(),
            camera: CAMERAS.choose(&mut rng)?.to_string(),
            pest: PESTS.choose(&mut rng)?.to_string(),
        })
    }
}

/// step the simulated climate every `interval` until shutdown
pub async fn run_climate_simulation(
    sim: Arc<SimulatedGreenhouse>,
    interval: Duration,
    mut shutdown: ShutdownSignal,
) {
    info!("[SENSOR] Climate simulation running ({}s interval)", interval.as_secs());
    while shutdown.sleep(interval).await {
        sim.step();
    }
    info!("[SENSOR] Climate simulation stopped");
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GreenhouseConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn greenhouse() -> SimulatedGreenhouse {
        let crops = Arc::new(CropRegistry::from_config(&GreenhouseConfig::default()));
        SimulatedGreenhouse::new(crops, false)
    }

    #[test]
    fn test_initial_readings_inside_optimal_range() {
        let sim = greenhouse();
        let readings = sim.all_zones_climate_data();
        assert_eq!(readings.len(), 5);
        for reading in readings.values() {
            let profile = sim.crops.profile_for_zone(&reading.zone_id).unwrap();
            assert!(profile.temp_range.contains(reading.temperature));
            assert!(profile.humidity_range.contains(reading.humidity));
        }
        assert_eq!(sim.available_zones()[0], "Zone-A");
    }

    #[test]
    fn test_drift_stays_within_step() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let (t, h) = drift(24.0, 70.0, None, &mut rng);
            assert!((t - 24.0).abs() <= TEMPERATURE_STEP + 1e-9);
            assert!((h - 70.0).abs() <= HUMIDITY_STEP + 1e-9);
        }
    }

    #[test]
    fn test_weather_shifts_and_humidity_clamps() {
        let mut rng = StdRng::seed_from_u64(11);
        let (t, _) = drift(24.0, 70.0, Some(Weather::Sunny), &mut rng);
        assert!(t >= 24.0 + 2.0 - TEMPERATURE_STEP - 1e-9);

        let (_, h) = drift(20.0, 99.5, Some(Weather::Rainy), &mut rng);
        assert_eq!(h, 100.0);
        let (_, h) = drift(30.0, 1.0, Some(Weather::Sunny), &mut rng);
        assert_eq!(h, 0.0);
    }

    #[test]
    fn test_step_refreshes_every_zone() {
        let sim = greenhouse();
        let before = sim.all_zones_climate_data();
        sim.step();
        let after = sim.all_zones_climate_data();
        assert_eq!(before.len(), after.len());
        for (zone, reading) in &after {
            assert!(reading.observed_at >= before[zone].observed_at);
            assert!((0.0..=100.0).contains(&reading.humidity));
        }
    }

    #[test]
    fn test_moisture_light_and_pests_cover_known_zones() {
        let sim = greenhouse();
        let moisture = sim.soil_moisture_levels();
        assert_eq!(moisture.len(), 5);
        assert!(moisture.values().all(|m| (20.0..80.0).contains(m)));

        let light = sim.light_intensity();
        assert!(light.values().all(|lux| *lux < 1000));

        let detection = sim.detect_pests().unwrap();
        assert_eq!(sim.crops.crop_for_zone(&detection.zone), Some(detection.crop.as_str()));
        assert!(CAMERAS.contains(&detection.camera.as_str()));
        assert!(PESTS.contains(&detection.pest.as_str()));
    }
}
