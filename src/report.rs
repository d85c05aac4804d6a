use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::config::ScoringConfig;
use crate::igc::TrackPoint;
use crate::waypoint::Waypoint;

const TIME_FORMAT: &str = "%m/%d/%Y, %H:%M:%S";

/// A waypoint together with the fix that achieved it.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Achievement {
    pub waypoint: Waypoint,
    pub point: TrackPoint,
}

/// Achievements in detection order, at most one per waypoint name. Recording a waypoint again
/// drops the earlier entry and appends the new one.
#[derive(Clone, Debug, Default)]
pub struct AchievementLog {
    entries: Vec<Achievement>,
    by_name: HashMap<String, usize>,
}

impl AchievementLog {
    pub fn record(&mut self, achievement: Achievement) {
        if let Some(index) = self.by_name.remove(&achievement.waypoint.name) {
            self.entries.remove(index);
            for later in self.by_name.values_mut().filter(|i| **i > index) {
                *later -= 1;
            }
        }
        self.by_name
            .insert(achievement.waypoint.name.clone(), self.entries.len());
        self.entries.push(achievement);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Achievement> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Achievement] {
        &self.entries
    }
}

fn serialize_time<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&time.format(TIME_FORMAT))
}

fn serialize_opt_time<S>(time: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match time {
        Some(time) => serialize_time(time, serializer),
        None => serializer.serialize_none(),
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct WaypointHit {
    pub wpt: String,
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub total: i32,
    pub wpt_list: Vec<WaypointHit>,
    #[serde(serialize_with = "serialize_opt_time")]
    pub finish_time: Option<NaiveDateTime>,
}

impl ScoreReport {
    /// Folds the achievements of a session into points.
    ///
    /// A session starts at the (non-positive) finish penalty. Reaching the finish as the very
    /// last achievement pays the penalty back and sets the finish time; a finish followed by
    /// anything else is counted for its points only.
    #[must_use]
    pub fn aggregate(achievements: &[Achievement], config: &ScoringConfig) -> Self {
        let start = config.starting_points();
        let mut report = ScoreReport {
            total: start,
            wpt_list: Vec::new(),
            finish_time: None,
        };

        for (i, achievement) in achievements.iter().enumerate() {
            let waypoint = &achievement.waypoint;
            report.total += waypoint.points;
            if config.is_finish(&waypoint.name) {
                if i + 1 == achievements.len() {
                    report.total -= start;
                    report.finish_time = Some(achievement.point.time);
                }
            } else if waypoint.points != 0 {
                report.wpt_list.push(WaypointHit {
                    wpt: waypoint.name.clone(),
                    time: achievement.point.time,
                });
            }
        }

        report
    }
}
