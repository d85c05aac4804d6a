use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::config::ScoringConfig;
use crate::igc::TrackPoint;
use crate::report::{Achievement, AchievementLog};
use crate::validator::{Validator, WaypointStatus};
use crate::waypoint::{Waypoint, Waypoints};
use crate::EARTH_RADIUS_KM;

use super::ScoringEngine;

const KM_PER_DEGREE: f64 = 111.0;

type Slot = usize;

/// Coarse grid over latitude and longitude. Each axis is an independent map from a rounded,
/// scaled coordinate to the waypoints whose cylinder reaches into that row or column.
#[derive(Clone, Debug, Default)]
struct BucketIndex {
    scale: f64,
    lat: HashMap<i64, BTreeSet<Slot>>,
    lng: HashMap<i64, BTreeSet<Slot>>,
    keys: HashMap<Slot, (Vec<i64>, Vec<i64>)>,
}

impl BucketIndex {
    fn new(precision_km: f64) -> Self {
        let exponent = (-(precision_km / KM_PER_DEGREE).log10()).ceil() as i32;
        BucketIndex {
            scale: 10_f64.powi(exponent),
            ..Default::default()
        }
    }

    fn bucket(&self, degrees: f64) -> i64 {
        (degrees * self.scale).round() as i64
    }

    fn margins(&self, waypoint: &Waypoint, cylinder_km: f64) -> (i64, i64) {
        let lat = (cylinder_km / KM_PER_DEGREE * self.scale).ceil() as i64;
        // widest longitude span of the cylinder is at the waypoint's own latitude
        let ratio = (cylinder_km / EARTH_RADIUS_KM).sin() / waypoint.coordinate.y().to_radians().cos();
        let lng = if ratio.is_finite() && ratio < 1.0 {
            (ratio.asin().to_degrees() * self.scale * (1.0 + 1e-9)).ceil() as i64
        } else {
            (180.0 * self.scale).ceil() as i64
        };
        (lat, lng)
    }

    fn insert(&mut self, slot: Slot, waypoint: &Waypoint, cylinder_km: f64) {
        let (lat_margin, lng_margin) = self.margins(waypoint, cylinder_km);
        let lat = self.bucket(waypoint.coordinate.y());
        let lng = self.bucket(waypoint.coordinate.x());
        let lat_keys = (lat - lat_margin..=lat + lat_margin).collect::<Vec<_>>();
        let lng_keys = (lng - lng_margin..=lng + lng_margin).collect::<Vec<_>>();
        for key in &lat_keys {
            self.lat.entry(*key).or_default().insert(slot);
        }
        for key in &lng_keys {
            self.lng.entry(*key).or_default().insert(slot);
        }
        self.keys.insert(slot, (lat_keys, lng_keys));
    }

    fn remove(&mut self, slot: Slot) {
        let Some((lat_keys, lng_keys)) = self.keys.remove(&slot) else {
            return;
        };
        for key in lat_keys {
            if let Some(slots) = self.lat.get_mut(&key) {
                slots.remove(&slot);
                if slots.is_empty() {
                    self.lat.remove(&key);
                }
            }
        }
        for key in lng_keys {
            if let Some(slots) = self.lng.get_mut(&key) {
                slots.remove(&slot);
                if slots.is_empty() {
                    self.lng.remove(&key);
                }
            }
        }
    }

    fn near(&self, point: &TrackPoint) -> BTreeSet<Slot> {
        let lat = self.lat.get(&self.bucket(point.coordinate.y()));
        let lng = self.lng.get(&self.bucket(point.coordinate.x()));
        match (lat, lng) {
            (Some(lat), Some(lng)) => lat.intersection(lng).copied().collect(),
            _ => BTreeSet::new(),
        }
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Engine that only evaluates waypoints sharing a grid row and column with the track point,
/// plus every land waypoint with a dwell in progress.
///
/// The finish stays in the index after it is reached, so the last time a pilot crosses the
/// finish is the one that counts.
#[derive(Clone, Debug)]
pub struct IndexedEngine {
    config: ScoringConfig,
    validators: Vec<Validator>,
    index: BucketIndex,
    active: BTreeSet<Slot>,
    hits: AchievementLog,
}

impl IndexedEngine {
    #[must_use]
    pub fn new(waypoints: &Waypoints, config: ScoringConfig) -> Self {
        let validators = waypoints
            .iter()
            .filter_map(Validator::for_waypoint)
            .collect::<Vec<_>>();
        let mut index = BucketIndex::new(config.precision_km());
        for (slot, validator) in validators.iter().enumerate() {
            index.insert(slot, validator.waypoint(), config.cylinder_km());
        }
        debug!(
            "spatial index: {} waypoints, scale {}, {} latitude / {} longitude buckets",
            index.len(),
            index.scale,
            index.lat.len(),
            index.lng.len()
        );

        IndexedEngine {
            config,
            validators,
            index,
            active: BTreeSet::new(),
            hits: AchievementLog::default(),
        }
    }

    /// Land waypoints currently mid-dwell.
    pub fn active(&self) -> impl Iterator<Item = &Waypoint> {
        self.active
            .iter()
            .map(|&slot| self.validators[slot].waypoint())
    }
}

impl ScoringEngine for IndexedEngine {
    fn observe(&mut self, point: &TrackPoint) {
        let mut candidates = self.index.near(point);
        candidates.extend(self.active.iter().copied());

        for slot in candidates {
            let validator = &mut self.validators[slot];
            match validator.submit(point, &self.config) {
                WaypointStatus::Success => {
                    self.active.remove(&slot);
                    let waypoint = validator.waypoint().clone();
                    if !self.config.is_finish(&waypoint.name) {
                        self.index.remove(slot);
                    }
                    debug!(
                        "{} achieved at {} ({:.5}, {:.5})",
                        waypoint.name,
                        point.time,
                        point.coordinate.y(),
                        point.coordinate.x()
                    );
                    self.hits.record(Achievement {
                        waypoint,
                        point: *point,
                    });
                }
                WaypointStatus::Active => {
                    self.active.insert(slot);
                }
                WaypointStatus::Missed => {
                    self.active.remove(&slot);
                }
            }
        }
    }

    fn achievements(&self) -> &[Achievement] {
        self.hits.as_slice()
    }

    fn config(&self) -> &ScoringConfig {
        &self.config
    }
}
