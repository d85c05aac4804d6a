use tracing::debug;

use crate::config::ScoringConfig;
use crate::igc::TrackPoint;
use crate::report::Achievement;
use crate::validator::{Validator, WaypointStatus};
use crate::waypoint::Waypoints;

use super::ScoringEngine;

/// Reference engine: every remaining waypoint is checked against every track point, touch
/// waypoints before land waypoints.
#[derive(Clone, Debug)]
pub struct LinearEngine {
    config: ScoringConfig,
    touch: Vec<Validator>,
    land: Vec<Validator>,
    achievements: Vec<Achievement>,
}

impl LinearEngine {
    #[must_use]
    pub fn new(waypoints: &Waypoints, config: ScoringConfig) -> Self {
        let (touch, land) = waypoints
            .iter()
            .filter_map(Validator::for_waypoint)
            .partition(|validator| matches!(validator, Validator::Touch(_)));
        LinearEngine {
            config,
            touch,
            land,
            achievements: Vec::new(),
        }
    }

    fn achieve(&mut self, validator: Validator, point: &TrackPoint) {
        debug!(
            "{} achieved at {} ({:.5}, {:.5})",
            validator.waypoint().name,
            point.time,
            point.coordinate.y(),
            point.coordinate.x()
        );
        self.achievements.push(Achievement {
            waypoint: validator.waypoint().clone(),
            point: *point,
        });
    }
}

/// Removes and returns the validators in `pool` that succeed on `point`, in pool order.
fn take_successes(
    pool: &mut Vec<Validator>,
    point: &TrackPoint,
    config: &ScoringConfig,
) -> Vec<Validator> {
    let mut achieved = Vec::new();
    let mut index = 0;
    while index < pool.len() {
        if pool[index].submit(point, config) == WaypointStatus::Success {
            achieved.push(pool.remove(index));
        } else {
            index += 1;
        }
    }
    achieved
}

impl ScoringEngine for LinearEngine {
    fn observe(&mut self, point: &TrackPoint) {
        // every waypoint sees every fix, so overlapping cylinders all count
        let touched = take_successes(&mut self.touch, point, &self.config);
        let landed = take_successes(&mut self.land, point, &self.config);
        for validator in touched.into_iter().chain(landed) {
            self.achieve(validator, point);
        }
    }

    fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    fn config(&self) -> &ScoringConfig {
        &self.config
    }
}
