use std::fmt::{Display, Formatter};

use crate::error::{HimawariArchError, Result};
use chrono::{naive::NaiveDateTime, Duration};

pub const DEFAULT_INTERVAL_MINUTES: i64 = 10;
pub const TIME_POINT_INPUT_FORMAT: &str = "%Y%m%d %H:%M";

/// One target scan time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint(NaiveDateTime);

impl TimePoint {
    pub fn new(dt: NaiveDateTime) -> Self {
        TimePoint(dt)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    pub fn year_month(&self) -> String {
        self.0.format("%Y%m").to_string()
    }

    pub fn day(&self) -> String {
        self.0.format("%d").to_string()
    }

    pub fn hour(&self) -> String {
        self.0.format("%H").to_string()
    }

    pub fn minute(&self) -> String {
        self.0.format("%M").to_string()
    }

    /// `YYYYMMDDHHMM`, the form embedded in archive file names
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d%H%M").to_string()
    }
}

impl Display for TimePoint {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M"))
    }
}

impl From<NaiveDateTime> for TimePoint {
    fn from(dt: NaiveDateTime) -> Self {
        TimePoint(dt)
    }
}

/// Parse a `YYYYMMDD HH:MM` time bound.
pub fn parse_time_point(input: &str) -> Result<TimePoint> {
    NaiveDateTime::parse_from_str(input.trim(), TIME_POINT_INPUT_FORMAT)
        .map(TimePoint)
        .map_err(|_| {
            HimawariArchError::InvalidInput(format!(
                "invalid date/time '{}', expected YYYYMMDD HH:MM",
                input
            ))
        })
}

/// All points `start + k * interval` that are `<= end`, start and end included when they fall
/// on that grid. A window with `start > end` yields nothing.
pub fn generate(start: TimePoint, end: TimePoint, interval_minutes: i64) -> Vec<TimePoint> {
    if start > end {
        log::warn!(
            "Start time {} is after end time {}. No time points will be generated.",
            start,
            end
        );
        return vec![];
    }

    if interval_minutes <= 0 {
        log::warn!("Non-positive interval of {} minutes.", interval_minutes);
        return vec![];
    }

    let interval = Duration::minutes(interval_minutes);
    let time_range: Vec<TimePoint> = (0..)
        .map(|i| start.0 + interval * i)
        .take_while(|time| *time <= end.0)
        .map(TimePoint)
        .collect();

    log::info!(
        "Generated {} time points from {} to {}.",
        time_range.len(),
        start,
        end
    );

    time_range
}
