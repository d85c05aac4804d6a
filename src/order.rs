use itertools::Itertools as _;
use tracing::{debug, warn};

use crate::igc::{TrackLog, TrackLogError};

/// Sorts a pilot's track logs by the time of their first fix.
///
/// Logs without a single fix go last. Ties keep their input order.
pub fn order_track_logs(logs: Vec<TrackLog>) -> Result<Vec<TrackLog>, TrackLogError> {
    let keyed = logs
        .into_iter()
        .map(|log| {
            let start = log.start_time()?;
            match start {
                Some(start) => debug!("{}: first fix at {start}", log.name),
                None => warn!("{}: no track points", log.name),
            }
            Ok((start, log))
        })
        .collect::<Result<Vec<_>, TrackLogError>>()?;

    Ok(keyed
        .into_iter()
        .sorted_by_key(|(start, _)| (start.is_none(), *start))
        .map(|(_, log)| log)
        .collect())
}
