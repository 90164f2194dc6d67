//! Decomposition of the time since the reference event into display units.
//!
//! Years here are a flat 365 days (31,536,000 seconds). Leap days are not
//! modelled, so over long spans the output drifts from the calendar.

use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDateTime, Offset, TimeZone};
use log::debug;

use crate::event::ReferenceEvent;

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const DAYS_PER_YEAR: i64 = 365;
pub const SECONDS_PER_YEAR: i64 = SECONDS_PER_DAY * DAYS_PER_YEAR;

/// Time elapsed since the reference event, split into units and totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElapsedBreakdown {
    pub years: i64,
    pub days: u16,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub total_days: i64,
    pub total_minutes: i64,
    pub total_seconds: i64,
}

impl fmt::Display for ElapsedBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} years, {} days, {} hours, {} minutes and {} seconds",
            self.years, self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Whole years to take off the event before subtracting, plus the
/// shifted event.
///
/// Only kicks in once `now` is more than a year past the event year, so
/// the remaining span is always under about two years.
pub fn year_correction(now_year: i32, event: &ReferenceEvent) -> (i64, ReferenceEvent) {
    let threshold = event.year() + 1;
    if now_year > threshold {
        let years_since = now_year - threshold;
        (
            i64::from(years_since),
            event.with_year(event.year() + years_since),
        )
    } else {
        (0, *event)
    }
}

/// Seconds since the Unix epoch of a wall-clock time in `tz`.
///
/// Ambiguous times take the earlier instant. Times skipped by a DST jump
/// use the offset in force just before the jump.
pub fn epoch_seconds<Tz: TimeZone>(tz: &Tz, local: &NaiveDateTime) -> i64 {
    match tz.from_local_datetime(local).earliest() {
        Some(at) => at.timestamp(),
        None => {
            // a day earlier, read as UTC, is before the jump in every zone
            let before = *local - Duration::days(1);
            let offset = tz.offset_from_utc_datetime(&before).fix().local_minus_utc();
            local.and_utc().timestamp() - i64::from(offset)
        }
    }
}

/// Split `since` seconds into units, on top of `years_since` whole years
/// already taken out.
///
/// Division floors, so a negative `since` still yields in-range units and
/// borrows from the year count.
pub fn decompose(since: i64, years_since: i64) -> ElapsedBreakdown {
    let total_seconds = since + years_since * SECONDS_PER_YEAR;

    let seconds = since.rem_euclid(60);
    let since = since.div_euclid(60);
    let minutes = since.rem_euclid(60);
    let since = since.div_euclid(60);
    let hours = since.rem_euclid(24);
    let since = since.div_euclid(24);
    let days = since.rem_euclid(DAYS_PER_YEAR);
    let since = since.div_euclid(DAYS_PER_YEAR);

    ElapsedBreakdown {
        years: years_since + since,
        days: days as u16,
        hours: hours as u8,
        minutes: minutes as u8,
        seconds: seconds as u8,
        total_days: total_seconds.div_euclid(SECONDS_PER_DAY),
        total_minutes: total_seconds.div_euclid(SECONDS_PER_MINUTE),
        total_seconds,
    }
}

pub fn compute_elapsed_in<Tz: TimeZone>(
    tz: &Tz,
    now: &NaiveDateTime,
    event: &ReferenceEvent,
) -> ElapsedBreakdown {
    let (years_since, adjusted) = year_correction(now.year(), event);
    let since = epoch_seconds(tz, now) - epoch_seconds(tz, &adjusted.to_naive());
    debug!("elapsed, event: {}, adjusted: {}, since: {}", event, adjusted, since);

    decompose(since, years_since)
}

/// Elapsed time from `event` to `now`, both read as host local time.
pub fn compute_elapsed(now: &NaiveDateTime, event: &ReferenceEvent) -> ElapsedBreakdown {
    compute_elapsed_in(&Local, now, event)
}
