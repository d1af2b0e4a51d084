//! Pure functions over instants: US equity market hours, holidays & Eastern-Time conversion.
//!
//! No single file elsewhere in this crate covers a market calendar directly, so this module
//! follows the general style used for small, free-function pure helpers over a domain type
//! (e.g. `Market::market_id`) rather than adapting one specific source.

pub mod holidays;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use thiserror::Error;

use crate::error::{ErrorKind, Kind};

/// Errors generated by the calendar module.
#[derive(Error, Debug, Copy, Clone)]
pub enum CalendarError {
    #[error("timestamp is NaN or otherwise not representable as a calendar instant")]
    InvalidInstant,
}

impl ErrorKind for CalendarError {
    fn kind(&self) -> Kind {
        match self {
            CalendarError::InvalidInstant => Kind::InvalidArgument,
        }
    }
}

fn market_open_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).expect("9:30:00 is a valid time")
}

fn market_close_time() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).expect("16:00:00 is a valid time")
}

/// Converts a raw Unix-epoch-seconds timestamp into a [`DateTime<Utc>`], rejecting NaN/infinite
/// or out-of-range values. Exists because upstream callers (e.g. a deserialized historical
/// timestamp) may hand this module a bare `f64` rather than an already-validated `DateTime`.
pub fn from_unix_seconds(seconds: f64) -> Result<DateTime<Utc>, CalendarError> {
    if !seconds.is_finite() {
        return Err(CalendarError::InvalidInstant);
    }
    DateTime::from_timestamp(seconds as i64, 0).ok_or(CalendarError::InvalidInstant)
}

/// Converts a UTC instant to its broken-down Eastern Time representation, correctly accounting
/// for the second-Sunday-of-March / first-Sunday-of-November DST transitions via the IANA
/// `America/New_York` timezone database.
pub fn to_et(t: DateTime<Utc>) -> DateTime<Tz> {
    t.with_timezone(&New_York)
}

/// True if `date` is a Monday-through-Friday trading day not in the fixed holiday set.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays::is_fixed_holiday(date)
}

/// Returns true if the US equity market is open at instant `t`.
pub fn is_market_open(t: DateTime<Utc>) -> bool {
    let et = to_et(t);
    if !is_trading_day(et.date_naive()) {
        return false;
    }
    let time = et.time();
    time >= market_open_time() && time < market_close_time()
}

/// Returns 09:30 Eastern Time on the given calendar date, as a UTC instant.
///
/// DST-fold/gap ambiguity (which cannot occur at 09:30 in `America/New_York`, but is handled
/// defensively) resolves to the earliest valid local instant.
pub fn to_market_open_et(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(market_open_time());
    New_York
        .from_local_datetime(&naive)
        .earliest()
        .expect("09:30 America/New_York is never in a DST gap")
        .with_timezone(&Utc)
}

/// Returns the next instant the market opens at or after `t`.
///
/// If `t` falls on a trading day before today's open, that same day's open is returned. If `t`
/// is during or after today's session, the next trading day's open is returned.
pub fn next_market_open(t: DateTime<Utc>) -> DateTime<Utc> {
    let et = to_et(t);
    let today = et.date_naive();

    if is_trading_day(today) && et.time() < market_open_time() {
        return to_market_open_et(today);
    }

    let mut candidate = today.succ_opt().expect("NaiveDate does not overflow in practice");
    while !is_trading_day(candidate) {
        candidate = candidate.succ_opt().expect("NaiveDate does not overflow in practice");
    }
    to_market_open_et(candidate)
}

/// Returns the fraction of the 6.5-hour session elapsed at instant `t` on its own trading day,
/// clamped to `[0.0, 6.5]`. Used by historical/simulated intraday interpolation.
pub fn intraday_hour_at(t: DateTime<Utc>) -> f64 {
    let et = to_et(t);
    let seconds_since_open = (et.time() - market_open_time()).num_seconds() as f64;
    (seconds_since_open / 3600.0).clamp(0.0, 6.5)
}
