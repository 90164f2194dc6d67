use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// The instant the clock counts up from, in local time, to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceEvent {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

pub const DEFAULT_EVENT: ReferenceEvent = ReferenceEvent {
    year: 2013,
    month: 1,
    day: 13,
    hour: 18,
    minute: 55,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    Format,
    Date,
    Time,
}

impl fmt::Display for EventError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventError::Format => fmt.write_str("expected \"YYYY-MM-DD HH:MM\""),
            EventError::Date => fmt.write_str("no such date"),
            EventError::Time => fmt.write_str("no such time of day"),
        }
    }
}

impl std::error::Error for EventError {}

impl ReferenceEvent {
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Result<Self, EventError> {
        NaiveDate::from_ymd_opt(year, month, day).ok_or(EventError::Date)?;
        if hour > 23 || minute > 59 {
            return Err(EventError::Time);
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The same month, day and time of day in another year.
    pub fn with_year(&self, year: i32) -> Self {
        Self { year, ..*self }
    }

    /// Calendar date and time of the event, seconds fixed at zero.
    ///
    /// A day past the end of its month (Feb 29 outside a leap year) rolls
    /// over into the next month rather than failing.
    pub fn to_naive(&self) -> NaiveDateTime {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|date| date.and_hms_opt(self.hour, self.minute, 0))
            .unwrap_or(NaiveDateTime::MIN);

        first + Duration::days(i64::from(self.day) - 1)
    }
}

impl Default for ReferenceEvent {
    fn default() -> Self {
        DEFAULT_EVENT
    }
}

impl FromStr for ReferenceEvent {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M"))
            .map_err(|_| EventError::Format)?;

        Self::new(
            parsed.year(),
            parsed.month(),
            parsed.day(),
            parsed.hour(),
            parsed.minute(),
        )
    }
}

impl fmt::Display for ReferenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}
