pub mod indexed;
pub mod linear;

use serde::Deserialize;

use crate::config::ScoringConfig;
use crate::igc::TrackPoint;
use crate::report::{Achievement, ScoreReport};
use crate::waypoint::Waypoints;

pub use indexed::IndexedEngine;
pub use linear::LinearEngine;

/// One scoring session. Track points must be observed in chronological order.
pub trait ScoringEngine {
    fn observe(&mut self, point: &TrackPoint);

    /// Achievements so far, in the order they count.
    fn achievements(&self) -> &[Achievement];

    fn config(&self) -> &ScoringConfig;

    fn report(&self) -> ScoreReport {
        ScoreReport::aggregate(self.achievements(), self.config())
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Linear,
    #[default]
    Indexed,
}

impl EngineKind {
    #[must_use]
    pub fn build(self, waypoints: &Waypoints, config: ScoringConfig) -> Box<dyn ScoringEngine> {
        match self {
            EngineKind::Linear => Box::new(LinearEngine::new(waypoints, config)),
            EngineKind::Indexed => Box::new(IndexedEngine::new(waypoints, config)),
        }
    }
}

impl<E: ScoringEngine + ?Sized> ScoringEngine for Box<E> {
    fn observe(&mut self, point: &TrackPoint) {
        (**self).observe(point);
    }

    fn achievements(&self) -> &[Achievement] {
        (**self).achievements()
    }

    fn config(&self) -> &ScoringConfig {
        (**self).config()
    }

    fn report(&self) -> ScoreReport {
        (**self).report()
    }
}
