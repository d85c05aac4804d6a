use std::fmt::{self, Display};
use std::io;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike as _};
use geo::{point, Point};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{trace, warn};

use crate::{decimal_to_deg_milli_min, deg_min_sec_to_decimal, read_to_string};

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HFDTE(?:DATE:)?([0-9]{2})([0-9]{2})([0-9]{2})").unwrap());

static B_RECORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^B
        ([0-9]{2})([0-9]{2})([0-9]{2})  # UTC time
        ([0-9]{2})([0-9]{5})([NS])      # latitude, 8 chars
        ([0-9]{3})([0-9]{5})([EW])      # longitude, 9 chars
        ([AV])                          # validity
        ([0-9]{5}|-[0-9]{4})            # pressure altitude
        ([0-9]{5}|-[0-9]{4})            # gps altitude
        ",
    )
    .unwrap()
});

#[derive(Error, Debug)]
pub enum IgcError {
    #[error("track point on line {line} precedes the HFDTE date header")]
    MissingDate { line: usize },
    #[error("failed to read track log: {0}")]
    FileRead(#[from] io::Error),
}

#[derive(Error, Debug)]
#[error("{log}: {source}")]
pub struct TrackLogError {
    pub log: String,
    #[source]
    pub source: IgcError,
}

/// One fix of a flight recorder.
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct TrackPoint {
    pub time: NaiveDateTime,
    pub coordinate: Point,
    pub alt_pressure: i32,
    pub alt_gps: i32,
    pub valid: bool,
}

/// Formats the point back into a fixed-width B record.
impl Display for TrackPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lat_deg, lat_min) = decimal_to_deg_milli_min(self.coordinate.y());
        let (lng_deg, lng_min) = decimal_to_deg_milli_min(self.coordinate.x());
        write!(
            f,
            "B{:02}{:02}{:02}{lat_deg:02}{lat_min:05}{}{lng_deg:03}{lng_min:05}{}{}{}{}",
            self.time.hour(),
            self.time.minute(),
            self.time.second(),
            if self.coordinate.y() < 0. { 'S' } else { 'N' },
            if self.coordinate.x() < 0. { 'W' } else { 'E' },
            if self.valid { 'A' } else { 'V' },
            format_altitude(self.alt_pressure),
            format_altitude(self.alt_gps),
        )
    }
}

fn format_altitude(alt: i32) -> String {
    if alt < 0 {
        format!("-{:04}", alt.unsigned_abs())
    } else {
        format!("{alt:05}")
    }
}

/// Line parser for IGC track logs.
///
/// B records carry only a time of day, so the parser keeps the date of the `HFDTE` header and
/// rolls it over when the fixes cross UTC midnight.
#[derive(Debug, Default)]
pub struct IgcParser {
    date: Option<NaiveDate>,
    start_time: Option<NaiveDateTime>,
    last_time: Option<NaiveDateTime>,
    line: usize,
}

impl IgcParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the first track point parsed so far.
    #[must_use]
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    /// Parses one raw line. Anything that is not a well-formed B record yields `Ok(None)`.
    pub fn parse_line(&mut self, raw: &str) -> Result<Option<TrackPoint>, IgcError> {
        self.line += 1;
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }
        if line.starts_with("HFDTE") {
            self.parse_date(line);
            return Ok(None);
        }
        if !line.starts_with('B') {
            trace!("line {}: skipping record {:?}", self.line, line.get(..1));
            return Ok(None);
        }

        let Some(captures) = B_RECORD_RE.captures(line) else {
            warn!("line {}: malformed B record {line:?}", self.line);
            return Ok(None);
        };
        let Some(date) = self.date else {
            return Err(IgcError::MissingDate { line: self.line });
        };

        let field = |i: usize| &captures[i];
        let number = |i: usize| field(i).parse::<u32>().ok();
        let altitude = |i: usize| field(i).parse::<i32>().ok();
        let (
            Some(hour),
            Some(minute),
            Some(second),
            Some(lat_deg),
            Some(lat_min),
            Some(lng_deg),
            Some(lng_min),
            Some(alt_pressure),
            Some(alt_gps),
        ) = (
            number(1),
            number(2),
            number(3),
            number(4),
            number(5),
            number(7),
            number(8),
            altitude(11),
            altitude(12),
        )
        else {
            warn!("line {}: unreadable number in {line:?}", self.line);
            return Ok(None);
        };
        let Some(time_of_day) = NaiveTime::from_hms_opt(hour, minute, second) else {
            warn!("line {}: invalid fix time in {line:?}", self.line);
            return Ok(None);
        };
        let mut time = date.and_time(time_of_day);
        if let Some(last) = self.last_time {
            if time + TimeDelta::hours(12) < last {
                if let Some(next_day) = date.succ_opt() {
                    trace!("line {}: crossed midnight, date is now {next_day}", self.line);
                    self.date = Some(next_day);
                    time = next_day.and_time(time_of_day);
                }
            }
        }

        let lat = deg_min_sec_to_decimal(
            field(6).chars().next().unwrap_or('N'),
            f64::from(lat_deg),
            f64::from(lat_min) / 1000.0,
            0.,
        );
        let lng = deg_min_sec_to_decimal(
            field(9).chars().next().unwrap_or('E'),
            f64::from(lng_deg),
            f64::from(lng_min) / 1000.0,
            0.,
        );

        let point = TrackPoint {
            time,
            coordinate: point! { x: lng, y: lat },
            valid: field(10) == "A",
            alt_pressure,
            alt_gps,
        };
        self.start_time.get_or_insert(time);
        self.last_time = Some(time);
        Ok(Some(point))
    }

    fn parse_date(&mut self, line: &str) {
        let date = DATE_RE.captures(line).and_then(|captures| {
            let number = |i: usize| captures[i].parse::<u32>().ok();
            NaiveDate::from_ymd_opt(2000 + number(3)? as i32, number(2)?, number(1)?)
        });
        match date {
            Some(date) => {
                self.date = Some(date);
                self.last_time = None;
            }
            None => warn!("line {}: invalid date header {line:?}", self.line),
        }
    }
}

/// The contents of one recorder file, named for error messages and logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackLog {
    pub name: String,
    content: String,
}

impl TrackLog {
    pub fn from_bytes(name: impl Into<String>, content: &[u8]) -> Result<Self, TrackLogError> {
        let name = name.into();
        match read_to_string(content) {
            Ok(content) => Ok(TrackLog { name, content }),
            Err(e) => Err(TrackLogError {
                log: name,
                source: e.into(),
            }),
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, TrackLogError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        match fs_err::read(path) {
            Ok(content) => Self::from_bytes(name, &content),
            Err(e) => Err(TrackLogError {
                log: name,
                source: e.into(),
            }),
        }
    }

    /// Parses the log from the top. Stops at the first fatal line.
    pub fn points(&self) -> impl Iterator<Item = Result<TrackPoint, TrackLogError>> + '_ {
        let mut parser = IgcParser::new();
        let mut failed = false;
        self.content.lines().map_while(move |line| {
            if failed {
                return None;
            }
            match parser.parse_line(line) {
                Ok(point) => Some(point.map(Ok)),
                Err(source) => {
                    failed = true;
                    Some(Some(Err(TrackLogError {
                        log: self.name.clone(),
                        source,
                    })))
                }
            }
        })
        .flatten()
    }

    /// Time of the first track point, reading no further than that.
    pub fn start_time(&self) -> Result<Option<NaiveDateTime>, TrackLogError> {
        self.points()
            .next()
            .transpose()
            .map(|point| point.map(|point| point.time))
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;
    use geo::point;

    use super::{IgcError, IgcParser, TrackLog, TrackPoint};

    fn parser_on(day: u32, month: u32, year: u32) -> IgcParser {
        let mut parser = IgcParser::new();
        let header = format!("HFDTE{day:02}{month:02}{:02}\r\n", year - 2000);
        assert!(parser.parse_line(&header).unwrap().is_none());
        parser
    }

    #[test]
    fn test_b_record() {
        let mut parser = parser_on(19, 10, 2020);
        let fix = parser
            .parse_line("B1102255206417N00006098WA0063100596\n")
            .unwrap()
            .unwrap();

        assert_eq!(
            fix.time,
            NaiveDate::from_ymd_opt(2020, 10, 19)
                .unwrap()
                .and_hms_opt(11, 2, 25)
                .unwrap()
        );
        assert!((fix.coordinate.y() - 52.106_95).abs() < 1e-12, "{fix:?}");
        assert!((fix.coordinate.x() + 0.101_633_333_333_333_33).abs() < 1e-12, "{fix:?}");
        assert_eq!(fix.alt_pressure, 631);
        assert_eq!(fix.alt_gps, 596);
        assert!(fix.valid);
        assert_eq!(parser.start_time(), Some(fix.time));
    }

    #[test]
    fn test_soft_skips() {
        let mut parser = parser_on(27, 9, 2020);
        for line in [
            "",
            "\r\n",
            "AXCT7b3b2a8d6b9f7c6f",
            "HFPLTPILOTINCHARGE: Someone",
            "I013638FXA",
            "B1102254435",
            "B110225443500XS16849015EA0063100596",
            "B1102254435000S16849015EX0063100596",
            "B9902254435000S16849015EA0063100596",
            "B11022\u{0665}4435000S16849015EA0063100596",
            "B1102254435000S16849015EA00631\u{0660}0596",
            "GREJNGJERJKNJKRE31895478537H43982FJN9248F942389T433T",
        ] {
            assert!(parser.parse_line(line).unwrap().is_none(), "{line:?}");
        }
        assert_eq!(parser.start_time(), None);
    }

    #[test]
    fn test_non_ascii_date_header() {
        let mut parser = parser_on(27, 9, 2020);
        assert!(parser.parse_line("HFDTE2\u{0667}0920").unwrap().is_none());
        let fix = parser
            .parse_line("B1102254435000S16849015EA0063100596")
            .unwrap()
            .unwrap();
        assert_eq!(fix.time.date(), NaiveDate::from_ymd_opt(2020, 9, 27).unwrap());
    }

    #[test]
    fn test_invalid_fix_and_negative_altitude() {
        let mut parser = parser_on(27, 9, 2020);
        let fix = parser
            .parse_line("B1102254435000S16849015EV-0012-0007")
            .unwrap()
            .unwrap();
        assert!(!fix.valid);
        assert_eq!(fix.alt_pressure, -12);
        assert_eq!(fix.alt_gps, -7);
        assert_eq!(fix.to_string(), "B1102254435000S16849015EV-0012-0007");
    }

    #[test]
    fn test_missing_date() {
        let mut parser = IgcParser::new();
        assert!(parser.parse_line("AXXXSOAR").unwrap().is_none());
        let err = parser
            .parse_line("B1102254435000S16849015EA0063100596")
            .unwrap_err();
        assert!(matches!(err, IgcError::MissingDate { line: 2 }), "{err}");
    }

    #[test]
    fn test_long_date_header() {
        let mut parser = IgcParser::new();
        assert!(parser.parse_line("HFDTEDATE:050221,01").unwrap().is_none());
        let fix = parser
            .parse_line("B0000014435000S16849015EA0063100596")
            .unwrap()
            .unwrap();
        assert_eq!(fix.time.date(), NaiveDate::from_ymd_opt(2021, 2, 5).unwrap());
    }

    #[test]
    fn test_midnight_rollover() {
        let mut parser = parser_on(31, 12, 2020);
        let before = parser
            .parse_line("B2359554435000S16849015EA0063100596")
            .unwrap()
            .unwrap();
        let after = parser
            .parse_line("B0000054435000S16849015EA0063100596")
            .unwrap()
            .unwrap();
        assert_eq!(after.time.date(), NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!((after.time - before.time).num_seconds(), 10);
    }

    #[test]
    fn test_format_roundtrip() {
        let mut parser = parser_on(27, 9, 2020);
        for line in [
            "B1102254456963S16832348EA0063100596",
            "B1102265206417N00006098WA0063100596",
            "B1102270000000N00000000EV0000000000",
            "B1102288959999N17959999WA0999909999",
        ] {
            let fix = parser.parse_line(line).unwrap().unwrap();
            assert_eq!(fix.to_string(), line);
            let reparsed = parser.parse_line(&fix.to_string()).unwrap().unwrap();
            assert!((reparsed.coordinate.x() - fix.coordinate.x()).abs() < 1e-9);
            assert!((reparsed.coordinate.y() - fix.coordinate.y()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_format_rounds_to_milli_minutes() {
        let fix = TrackPoint {
            time: NaiveDate::from_ymd_opt(2020, 9, 27)
                .unwrap()
                .and_hms_opt(11, 2, 25)
                .unwrap(),
            coordinate: point! { x: 168.539_127_777, y: -44.949_383_333 },
            alt_pressure: 631,
            alt_gps: 596,
            valid: true,
        };
        assert_eq!(fix.to_string(), "B1102254456963S16832348EA0063100596");
    }

    #[test]
    fn test_track_log_points() {
        let log = TrackLog::from_bytes(
            "flight.igc",
            b"AXCT7b3b2a8d6b9f7c6f\r\nHFDTE270920\r\nB1102254435000S16849015EA0063100596\r\nLXCTsomething\r\nB1102354435000S16849015EA0063100596\r\n",
        )
        .unwrap();
        let points = log.points().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(log.start_time().unwrap(), Some(points[0].time));
        assert_eq!((points[1].time - points[0].time).num_seconds(), 10);
    }

    #[test]
    fn test_track_log_missing_date() {
        let log = TrackLog::from_bytes(
            "nodate.igc",
            b"B1102254435000S16849015EA0063100596\nHFDTE270920\nB1102354435000S16849015EA0063100596\n",
        )
        .unwrap();
        let results = log.points().collect::<Vec<_>>();
        assert_eq!(results.len(), 1);
        let err = log.start_time().unwrap_err();
        assert_eq!(err.log, "nodate.igc");
        assert!(matches!(err.source, IgcError::MissingDate { line: 1 }), "{err}");
        assert_eq!(
            err.to_string(),
            "nodate.igc: track point on line 1 precedes the HFDTE date header"
        );
    }

    #[test]
    fn test_track_log_without_fixes() {
        let log = TrackLog::from_bytes("empty.igc", b"HFDTE270920\n").unwrap();
        assert_eq!(log.start_time().unwrap(), None);
        assert_eq!(log.points().count(), 0);
    }

    #[test]
    fn test_missing_file() {
        let err = TrackLog::read("fixtures/does-not-exist.igc").unwrap_err();
        assert!(matches!(err.source, IgcError::FileRead(_)), "{err}");
        assert!(err.to_string().contains("does-not-exist.igc"), "{err}");
    }
}
