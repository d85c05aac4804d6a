use std::num::NonZeroUsize;

use serde::Serialize;

use crate::igc::TrackPoint;

fn round3(v: f64) -> f64 {
    (v * 1_000.0).round() / 1_000.0
}

/// Thinned-out copy of one track log for drawing it on a map.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TrackSamples {
    pub tracklog: String,
    /// `(longitude, latitude)` rounded to three decimals.
    pub samples: Vec<(f64, f64)>,
}

/// Keeps every `rate`-th track point, starting with the first.
#[derive(Clone, Debug)]
pub struct TrackSampler {
    rate: NonZeroUsize,
    counter: usize,
    samples: TrackSamples,
}

impl TrackSampler {
    #[must_use]
    pub fn new(tracklog: impl Into<String>, rate: NonZeroUsize) -> Self {
        TrackSampler {
            rate,
            counter: 0,
            samples: TrackSamples {
                tracklog: tracklog.into(),
                samples: Vec::new(),
            },
        }
    }

    pub fn sample(&mut self, point: &TrackPoint) {
        if self.counter % self.rate.get() == 0 {
            self.samples
                .samples
                .push((round3(point.coordinate.x()), round3(point.coordinate.y())));
            self.counter = 0;
        }
        self.counter += 1;
    }

    #[must_use]
    pub fn finish(self) -> TrackSamples {
        self.samples
    }
}

#[cfg(test)]
mod test {
    use std::num::NonZeroUsize;

    use geo::point;

    use crate::validator::test::fix;

    use super::TrackSampler;

    #[test]
    fn test_every_third() {
        let mut sampler = TrackSampler::new("flight.igc", NonZeroUsize::new(3).unwrap());
        for i in 0..7 {
            let coordinate = point! { x: 168.539_128 + f64::from(i) * 0.01, y: -44.949_383 };
            sampler.sample(&fix(i64::from(i) * 10, coordinate, 1000));
        }
        let samples = sampler.finish();
        assert_eq!(samples.tracklog, "flight.igc");
        assert_eq!(
            samples.samples,
            [(168.539, -44.949), (168.569, -44.949), (168.599, -44.949)]
        );
        assert_eq!(
            serde_json::to_string(&samples).unwrap(),
            r#"{"tracklog":"flight.igc","samples":[[168.539,-44.949],[168.569,-44.949],[168.599,-44.949]]}"#
        );
    }

    #[test]
    fn test_rate_one_keeps_all() {
        let mut sampler = TrackSampler::new("flight.igc", NonZeroUsize::MIN);
        for i in 0..4 {
            sampler.sample(&fix(i * 10, point! { x: 0., y: 0. }, 0));
        }
        assert_eq!(sampler.finish().samples.len(), 4);
    }
}
