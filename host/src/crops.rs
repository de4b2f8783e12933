//! crop registry - static zone -> crop -> optimal range lookup
//!
//! built once from config and shared read-only (behind an Arc) by every
//! subsystem that needs to know what grows where.

use crate::config::GreenhouseConfig;
use crate::domain::CropProfile;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CropRegistry {
    zones: BTreeMap<String, String>,
    profiles: BTreeMap<String, CropProfile>,
}

impl CropRegistry {
    pub fn new(
        zones: BTreeMap<String, String>,
        profiles: impl IntoIterator<Item = CropProfile>,
    ) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|p| (p.crop_name.clone(), p))
            .collect::<BTreeMap<_, _>>();

        for (zone, crop) in &zones {
            if !profiles.contains_key(crop) {
                warn!("[CROPS] {} is assigned {} but no profile exists; zone stays uncontrolled", zone, crop);
            }
        }

        Self { zones, profiles }
    }

    pub fn from_config(config: &GreenhouseConfig) -> Self {
        let profiles = config.crops.iter().map(|(name, ranges)| CropProfile {
            crop_name: name.clone(),
            temp_range: ranges.temp_range,
            humidity_range: ranges.humidity_range,
        });
        Self::new(config.zones.clone(), profiles)
    }

    /// crop planted in a zone, if the zone is assigned one
    pub fn crop_for_zone(&self, zone_id: &str) -> Option<&str> {
        self.zones.get(zone_id).map(String::as_str)
    }

    pub fn profile(&self, crop_name: &str) -> Option<&CropProfile> {
        self.profiles.get(crop_name)
    }

    /// profile for a zone; None means the zone is unmapped
    pub fn profile_for_zone(&self, zone_id: &str) -> Option<&CropProfile> {
        self.crop_for_zone(zone_id).and_then(|crop| self.profile(crop))
    }

    /// zones that have a usable crop profile, in id order
    pub fn controlled_zones(&self) -> impl Iterator<Item = &str> {
        self.zones
            .iter()
            .filter(|(_, crop)| self.profiles.contains_key(*crop))
            .map(|(zone, _)| zone.as_str())
    }

    /// every assigned zone, including ones whose crop has no profile
    pub fn zone_ids(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Range;

    fn registry() -> CropRegistry {
        let zones = [("Zone-A", "Tomatoes"), ("Zone-Q", "Quinoa")]
            .into_iter()
            .map(|(z, c)| (z.to_string(), c.to_string()))
            .collect();
        let tomatoes = CropProfile {
            crop_name: "Tomatoes".to_string(),
            temp_range: Range::new(21.0, 27.0),
            humidity_range: Range::new(65.0, 80.0),
        };
        CropRegistry::new(zones, [tomatoes])
    }

    #[test]
    fn test_zone_lookup() {
        let crops = registry();
        assert_eq!(crops.crop_for_zone("Zone-A"), Some("Tomatoes"));
        assert_eq!(crops.profile_for_zone("Zone-A").map(|p| p.temp_range.max), Some(27.0));
        assert!(crops.profile_for_zone("Zone-Z").is_none());
    }

    #[test]
    fn test_zone_without_profile_is_not_controlled() {
        let crops = registry();
        assert_eq!(crops.crop_for_zone("Zone-Q"), Some("Quinoa"));
        assert!(crops.profile_for_zone("Zone-Q").is_none());
        assert_eq!(crops.controlled_zones().collect::<Vec<_>>(), vec!["Zone-A"]);
        assert_eq!(crops.zone_ids().count(), 2);
    }

    #[test]
    fn test_from_default_config() {
        let crops = CropRegistry::from_config(&GreenhouseConfig::default());
        assert_eq!(crops.controlled_zones().count(), 5);
        assert_eq!(crops.profile_for_zone("Zone-E").unwrap().crop_name, "Herbs");
    }
}
