use std::num::NonZeroUsize;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::ConfigError;
use crate::engine::ScoringEngine;
use crate::igc::{TrackLog, TrackLogError};
use crate::order::order_track_logs;
use crate::report::ScoreReport;
use crate::sampler::{TrackSampler, TrackSamples};
use crate::waypoint::WaypointError;

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("track log {0}")]
    Track(#[from] TrackLogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Waypoint(#[from] WaypointError),
}

pub type ScoringResult<T> = Result<T, ScoringError>;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ScoredSession {
    #[serde(flatten)]
    pub report: ScoreReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<TrackSamples>,
}

/// Drives one pilot's scoring session: all of their track logs, in flight order, through a
/// single engine.
pub struct Scorer<E> {
    engine: E,
    sample_rate: Option<NonZeroUsize>,
}

impl<E: ScoringEngine> Scorer<E> {
    #[must_use]
    pub fn new(engine: E) -> Self {
        Scorer {
            engine,
            sample_rate: None,
        }
    }

    /// Also keep every `rate`-th track point of each log.
    #[must_use]
    pub fn with_sampling(mut self, rate: NonZeroUsize) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn score_log(&mut self, log: &TrackLog) -> ScoringResult<Option<TrackSamples>> {
        let mut sampler = self
            .sample_rate
            .map(|rate| TrackSampler::new(log.name.clone(), rate));
        let mut count = 0_usize;
        for point in log.points() {
            let point = point?;
            self.engine.observe(&point);
            if let Some(sampler) = sampler.as_mut() {
                sampler.sample(&point);
            }
            count += 1;
        }
        info!(
            "{}: {count} track points, {} waypoints so far",
            log.name,
            self.engine.achievements().len()
        );
        Ok(sampler.map(TrackSampler::finish))
    }

    pub fn score_logs(mut self, logs: Vec<TrackLog>) -> ScoringResult<ScoredSession> {
        let mut samples = Vec::new();
        for log in order_track_logs(logs)? {
            samples.extend(self.score_log(&log)?);
        }
        Ok(ScoredSession {
            report: self.engine.report(),
            samples,
        })
    }
}

pub fn score_files<P: AsRef<Path>>(
    engine: impl ScoringEngine,
    paths: &[P],
) -> ScoringResult<ScoreReport> {
    let logs = paths
        .iter()
        .map(TrackLog::read)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Scorer::new(engine).score_logs(logs)?.report)
}
