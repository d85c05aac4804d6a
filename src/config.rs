use std::io;
use std::path::Path;

use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;
use uom::si::f64::Length;
use uom::si::length::{kilometer, meter};

pub const DEFAULT_FINISH_WAYPOINT: &str = "FINISH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read scoring config: {0}")]
    FileRead(#[from] io::Error),
    #[error("invalid scoring config: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("scoring config value {key} must be positive")]
    NotPositive { key: &'static str },
}

/// Competition config as stored next to the waypoint file.
#[derive(Debug, Deserialize)]
struct ScoringConfigJson {
    cylinder_km: f64,
    time_landed_min: f64,
    time_altitude_var_meters: f64,
    distance_variance_meters: f64,
    precision_km: f64,
    finish_penalty_pts: Option<i32>,
    finish_waypoint: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoringConfig {
    /// Radius around a waypoint that counts as reaching it.
    pub cylinder: Length,
    /// How long a pilot has to stay put inside a land waypoint's cylinder.
    pub min_dwell: TimeDelta,
    /// Allowed GPS altitude drift while dwelling.
    pub altitude_variance: Length,
    /// Allowed horizontal drift while dwelling, exclusive.
    pub distance_variance: Length,
    /// Cell size of the spatial index.
    pub precision: Length,
    /// Points a competitor starts in the hole until the finish is the last achievement.
    pub finish_penalty: Option<i32>,
    pub finish_waypoint: String,
}

pub type ScoringConfigResult = Result<ScoringConfig, ConfigError>;

impl ScoringConfig {
    pub fn parse(content: &[u8]) -> ScoringConfigResult {
        let json: ScoringConfigJson = serde_json::from_slice(content)?;
        Self::try_from(json)
    }

    pub fn read(path: impl AsRef<Path>) -> ScoringConfigResult {
        Self::parse(&fs_err::read(path.as_ref())?)
    }

    #[must_use]
    pub fn cylinder_km(&self) -> f64 {
        self.cylinder.get::<kilometer>()
    }

    #[must_use]
    pub fn precision_km(&self) -> f64 {
        self.precision.get::<kilometer>()
    }

    /// Score a session starts with, never positive.
    #[must_use]
    pub fn starting_points(&self) -> i32 {
        self.finish_penalty.map_or(0, |penalty| -penalty.abs())
    }

    pub fn is_finish(&self, name: &str) -> bool {
        self.finish_waypoint == name
    }
}

impl TryFrom<ScoringConfigJson> for ScoringConfig {
    type Error = ConfigError;

    fn try_from(json: ScoringConfigJson) -> ScoringConfigResult {
        if json.cylinder_km.is_nan() || json.cylinder_km <= 0. {
            return Err(ConfigError::NotPositive { key: "cylinder_km" });
        }
        if json.precision_km.is_nan() || json.precision_km <= 0. {
            return Err(ConfigError::NotPositive { key: "precision_km" });
        }
        Ok(ScoringConfig {
            cylinder: Length::new::<kilometer>(json.cylinder_km),
            min_dwell: TimeDelta::milliseconds((json.time_landed_min * 60_000.0).round() as i64),
            altitude_variance: Length::new::<meter>(json.time_altitude_var_meters),
            distance_variance: Length::new::<meter>(json.distance_variance_meters),
            precision: Length::new::<kilometer>(json.precision_km),
            finish_penalty: json.finish_penalty_pts,
            finish_waypoint: json
                .finish_waypoint
                .unwrap_or_else(|| DEFAULT_FINISH_WAYPOINT.to_string()),
        })
    }
}

/// The settings the Wanaka hike & fly competition was scored with.
#[cfg(test)]
pub(crate) fn wanaka_config(finish_penalty: Option<i32>) -> ScoringConfig {
    ScoringConfig {
        cylinder: Length::new::<kilometer>(1.),
        min_dwell: TimeDelta::minutes(1),
        altitude_variance: Length::new::<meter>(30.),
        distance_variance: Length::new::<meter>(10.),
        precision: Length::new::<kilometer>(1.),
        finish_penalty,
        finish_waypoint: DEFAULT_FINISH_WAYPOINT.to_string(),
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeDelta;
    use uom::si::length::meter;

    use super::{wanaka_config, ConfigError, ScoringConfig};

    #[test]
    fn test_parse() {
        let config = ScoringConfig::parse(
            br#"{"cylinder_km": 1, "time_landed_min": 1,
                 "time_altitude_var_meters": 30, "distance_variance_meters": 10,
                 "precision_km": 1, "finish_penalty_pts": -8}"#,
        )
        .unwrap();

        assert!((config.cylinder_km() - 1.).abs() < f64::EPSILON);
        assert!((config.precision_km() - 1.).abs() < f64::EPSILON);
        assert!((config.cylinder.get::<meter>() - 1000.).abs() < 1e-9);
        assert!((config.distance_variance.get::<meter>() - 10.).abs() < 1e-9);
        assert!((config.altitude_variance.get::<meter>() - 30.).abs() < 1e-9);
        assert_eq!(config.min_dwell, TimeDelta::minutes(1));
        assert_eq!(config.starting_points(), -8);
        assert!(config.is_finish("FINISH"));
        assert!(!config.is_finish("2_BENMOR"));
        assert_eq!(config, wanaka_config(Some(-8)));
    }

    #[test]
    fn test_optional_keys() {
        let config = ScoringConfig::parse(
            br#"{"cylinder_km": 0.4, "time_landed_min": 0.5,
                 "time_altitude_var_meters": 30, "distance_variance_meters": 10,
                 "precision_km": 1, "finish_waypoint": "GOAL"}"#,
        )
        .unwrap();
        assert_eq!(config.finish_penalty, None);
        assert_eq!(config.starting_points(), 0);
        assert_eq!(config.min_dwell, TimeDelta::seconds(30));
        assert!(config.is_finish("GOAL"));
        assert!(!config.is_finish("FINISH"));
    }

    #[test]
    fn test_positive_penalty_still_deducts() {
        let config = ScoringConfig::parse(
            br#"{"cylinder_km": 1, "time_landed_min": 1,
                 "time_altitude_var_meters": 30, "distance_variance_meters": 10,
                 "precision_km": 1, "finish_penalty_pts": 8}"#,
        )
        .unwrap();
        assert_eq!(config.starting_points(), -8);
    }

    #[test]
    fn test_missing_key() {
        let err = ScoringConfig::parse(
            br#"{"cylinder_km": 1, "time_landed_min": 1,
                 "time_altitude_var_meters": 30, "precision_km": 1}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)), "{err}");
        assert!(err.to_string().contains("distance_variance_meters"), "{err}");
    }

    #[test]
    fn test_not_positive() {
        let err = ScoringConfig::parse(
            br#"{"cylinder_km": 0, "time_landed_min": 1,
                 "time_altitude_var_meters": 30, "distance_variance_meters": 10,
                 "precision_km": 1}"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::NotPositive { key: "cylinder_km" }),
            "{err}"
        );
    }
}
