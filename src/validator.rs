use serde::Serialize;
use uom::si::length::meter;

use crate::config::ScoringConfig;
use crate::distance_km;
use crate::igc::TrackPoint;
use crate::waypoint::{Waypoint, WaypointKind};

/// Outcome of feeding one track point to a waypoint.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum WaypointStatus {
    Missed,
    /// Inside the cylinder, dwell in progress.
    Active,
    Success,
}

#[derive(Clone, Debug)]
pub struct TouchValidator {
    waypoint: Waypoint,
}

impl TouchValidator {
    fn submit(&self, point: &TrackPoint, config: &ScoringConfig) -> WaypointStatus {
        if in_cylinder(&self.waypoint, point, config) {
            WaypointStatus::Success
        } else {
            WaypointStatus::Missed
        }
    }
}

/// Dwell detector for land waypoints. The anchor is the fix the current dwell started at.
#[derive(Clone, Debug)]
pub struct LandValidator {
    waypoint: Waypoint,
    anchor: Option<TrackPoint>,
}

impl LandValidator {
    fn submit(&mut self, point: &TrackPoint, config: &ScoringConfig) -> WaypointStatus {
        if !in_cylinder(&self.waypoint, point, config) {
            self.anchor = None;
            return WaypointStatus::Missed;
        }
        let Some(anchor) = self.anchor else {
            self.anchor = Some(*point);
            return WaypointStatus::Active;
        };

        let altitude_drift = f64::from(anchor.alt_gps.abs_diff(point.alt_gps));
        let horizontal_drift = distance_km(anchor.coordinate, point.coordinate) * 1000.0;
        if altitude_drift <= config.altitude_variance.get::<meter>()
            && horizontal_drift < config.distance_variance.get::<meter>()
        {
            if point.time - anchor.time >= config.min_dwell {
                WaypointStatus::Success
            } else {
                WaypointStatus::Active
            }
        } else {
            // moved, the dwell starts over from here
            self.anchor = Some(*point);
            WaypointStatus::Active
        }
    }

    #[must_use]
    pub fn anchor(&self) -> Option<&TrackPoint> {
        self.anchor.as_ref()
    }
}

fn in_cylinder(waypoint: &Waypoint, point: &TrackPoint, config: &ScoringConfig) -> bool {
    distance_km(point.coordinate, waypoint.coordinate) <= config.cylinder_km()
}

/// Completion check of one waypoint for the length of a scoring session.
#[derive(Clone, Debug)]
pub enum Validator {
    Touch(TouchValidator),
    Land(LandValidator),
}

impl Validator {
    /// Camp and untyped waypoints are never scored and get no validator.
    #[must_use]
    pub fn for_waypoint(waypoint: &Waypoint) -> Option<Self> {
        match waypoint.kind {
            WaypointKind::Touch => Some(Validator::Touch(TouchValidator {
                waypoint: waypoint.clone(),
            })),
            WaypointKind::Land => Some(Validator::Land(LandValidator {
                waypoint: waypoint.clone(),
                anchor: None,
            })),
            WaypointKind::Camp | WaypointKind::None => None,
        }
    }

    pub fn submit(&mut self, point: &TrackPoint, config: &ScoringConfig) -> WaypointStatus {
        match self {
            Validator::Touch(touch) => touch.submit(point, config),
            Validator::Land(land) => land.submit(point, config),
        }
    }

    #[must_use]
    pub fn waypoint(&self) -> &Waypoint {
        match self {
            Validator::Touch(touch) => &touch.waypoint,
            Validator::Land(land) => &land.waypoint,
        }
    }
}
