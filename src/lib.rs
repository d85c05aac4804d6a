use std::io;

use geo::Point;
use tracing::warn;

pub mod config;
pub mod engine;
pub mod igc;
pub mod order;
pub mod report;
pub mod sampler;
pub mod scorer;
pub mod validator;
pub mod waypoint;

/// Mean earth radius used for every distance in a scoring session.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn read_to_string(contents: &[u8]) -> Result<String, io::Error> {
    String::from_utf8(contents.to_vec()).or_else(|_| {
        let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
        if errors {
            warn!("errors while decoding win-1252");
        }
        Ok(string.to_string())
    })
}

/// Converts a compass-signed degree/minute/second triple to signed decimal degrees.
///
/// `S` and `W` negate, anything else is positive.
#[must_use]
pub fn deg_min_sec_to_decimal(direction: char, degrees: f64, minutes: f64, seconds: f64) -> f64 {
    let sign = match direction {
        'S' | 'W' => -1.0,
        _ => 1.0,
    };
    sign * (degrees + minutes / 60.0 + seconds / 3600.0)
}

/// Splits a signed decimal degree into whole degrees and thousandths of a minute, the
/// resolution of a track log fix. Carries into the next degree when the minutes round up to 60.
fn decimal_to_deg_milli_min(decimal: f64) -> (u32, u32) {
    let abs = decimal.abs();
    let mut degrees = abs.trunc() as u32;
    let mut milli_min = (abs.fract() * 60_000.0).round() as u32;
    if milli_min >= 60_000 {
        degrees += 1;
        milli_min -= 60_000;
    }
    (degrees, milli_min)
}

/// Great-circle distance in kilometres (haversine).
#[must_use]
pub fn distance_km(a: Point, b: Point) -> f64 {
    let (lat_a, lat_b) = (a.y().to_radians(), b.y().to_radians());
    let d_lat = lat_b - lat_a;
    let d_lng = (b.x() - a.x()).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
