use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, SecondsFormat,
    TimeDelta, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use thiserror::Error;

use crate::interval::Interval;

/// Naive date-time layouts accepted by [`Timestamp::parse`]; interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Errors produced while interpreting text as a timestamp or time unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampParseError {
    #[error("cannot interpret '{input}' as a timestamp")]
    Unrecognized { input: String },

    #[error("unknown time unit '{unit}'")]
    UnknownUnit { unit: String },

    #[error("invalid UTC offset '{input}', expected e.g. '+05:00', '-0330' or 'Z'")]
    InvalidOffset { input: String },
}

/// Parse an ISO 8601 UTC offset: `Z`, `UTC`, `+05`, `+0530` or `+05:30`.
///
/// ```
/// use cellwhen_types::timestamp::parse_utc_offset;
///
/// assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19_800);
/// assert_eq!(parse_utc_offset("-08").unwrap().local_minus_utc(), -28_800);
/// assert!(parse_utc_offset("+5:30").is_err());
/// ```
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset, TimestampParseError> {
    let invalid = || TimestampParseError::InvalidOffset {
        input: input.to_string(),
    };
    let text = input.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = match rest.len() {
        2 | 4 => rest.to_string(),
        5 if rest.as_bytes()[2] == b':' => rest.replacen(':', "", 1),
        _ => return Err(invalid()),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().map_err(|_| invalid())?
    } else {
        0
    };
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// A point in time, totally ordered, with nanosecond resolution.
///
/// Every cell carries one of these as its write time. Arithmetic with
/// [`Interval`] is checked: results outside the representable range are
/// reported as `None` rather than wrapping.
///
/// # Examples
///
/// ```
/// use cellwhen_types::timestamp::Timestamp;
/// use cellwhen_types::interval::Interval;
///
/// let start = Timestamp::parse("2025-01-31").unwrap();
/// let next = start.checked_add_interval(Interval::months(1)).unwrap();
/// assert_eq!(next.to_string(), "2025-02-28T00:00:00Z");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap a chrono UTC date-time.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Read the wall clock.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Seconds since the Unix epoch. `None` when out of range.
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Milliseconds since the Unix epoch. `None` when out of range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    pub fn to_system_time(self) -> SystemTime {
        SystemTime::from(self.0)
    }

    /// Parse an RFC 3339 instant, a naive date-time (UTC) or a bare date
    /// (midnight UTC).
    pub fn parse(input: &str) -> Result<Self, TimestampParseError> {
        let text = input.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(parsed.with_timezone(&Utc)));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(Self(naive.and_utc()));
            }
        }

        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| TimestampParseError::Unrecognized {
                input: input.to_string(),
            })
    }

    /// Shift forward by an interval: months first, then days, then the
    /// sub-day part. Month arithmetic clamps to the last day of the month.
    pub fn checked_add_interval(self, interval: Interval) -> Option<Self> {
        let mut datetime = self.0;

        if interval.months > 0 {
            datetime = datetime.checked_add_months(Months::new(interval.months.unsigned_abs()))?;
        } else if interval.months < 0 {
            datetime = datetime.checked_sub_months(Months::new(interval.months.unsigned_abs()))?;
        }

        if interval.days != 0 {
            datetime = datetime.checked_add_signed(TimeDelta::try_days(i64::from(interval.days))?)?;
        }

        if interval.nanos != 0 {
            datetime = datetime.checked_add_signed(TimeDelta::nanoseconds(interval.nanos))?;
        }

        Some(Self(datetime))
    }

    pub fn checked_sub_interval(self, interval: Interval) -> Option<Self> {
        self.checked_add_interval(interval.checked_neg()?)
    }

    /// Truncate to the start of the enclosing unit. Weeks start on Monday.
    pub fn trunc(self, unit: TimeUnit) -> Option<Self> {
        Some(Self(trunc_naive(self.0.naive_utc(), unit)?.and_utc()))
    }

    /// Truncate on the wall clock of `offset`, returning the instant that
    /// local boundary falls on. `date_trunc('day', ts, '+05:00')` is local
    /// midnight in UTC+5, i.e. 19:00 UTC the day before.
    pub fn trunc_at(self, unit: TimeUnit, offset: FixedOffset) -> Option<Self> {
        let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
        let local = self.0.naive_utc().checked_add_signed(shift)?;
        let truncated = trunc_naive(local, unit)?.checked_sub_signed(shift)?;
        Some(Self(truncated.and_utc()))
    }

    /// Extract a calendar field in UTC.
    pub fn part(self, part: DatePart) -> i64 {
        part.extract(&self.0.naive_utc())
    }

    /// Extract a calendar field on the wall clock of `offset`.
    pub fn part_at(self, part: DatePart, offset: FixedOffset) -> Option<i64> {
        let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
        let local = self.0.naive_utc().checked_add_signed(shift)?;
        Some(part.extract(&local))
    }
}

fn trunc_naive(naive: NaiveDateTime, unit: TimeUnit) -> Option<NaiveDateTime> {
    let date = naive.date();
    let truncated = match unit {
        TimeUnit::Second => naive.with_nanosecond(0)?,
        TimeUnit::Minute => date.and_hms_opt(naive.hour(), naive.minute(), 0)?,
        TimeUnit::Hour => date.and_hms_opt(naive.hour(), 0, 0)?,
        TimeUnit::Day => date.and_hms_opt(0, 0, 0)?,
        TimeUnit::Week => {
            let back = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(back))?.and_hms_opt(0, 0, 0)?
        }
        TimeUnit::Month => {
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?
        }
        TimeUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
    };
    Some(truncated)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl FromStr for Timestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self(DateTime::<Utc>::from(time))
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        ts.to_system_time()
    }
}

/// Calendar unit used by `date_trunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "second" | "seconds" => TimeUnit::Second,
            "minute" | "minutes" => TimeUnit::Minute,
            "hour" | "hours" => TimeUnit::Hour,
            "day" | "days" => TimeUnit::Day,
            "week" | "weeks" => TimeUnit::Week,
            "month" | "months" => TimeUnit::Month,
            "year" | "years" => TimeUnit::Year,
            _ => {
                return Err(TimestampParseError::UnknownUnit {
                    unit: s.to_string(),
                });
            }
        };
        Ok(unit)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar field read by `date_part`.
///
/// Sub-second parts count within the current second. `dow` numbers Sunday as
/// 0, `isodow` numbers Monday 1 through Sunday 7, `week` is the ISO week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePart {
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    DayOfWeek,
    IsoDayOfWeek,
    DayOfYear,
    Week,
    Month,
    Quarter,
    Year,
}

impl DatePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Microsecond => "microsecond",
            DatePart::Millisecond => "millisecond",
            DatePart::Second => "second",
            DatePart::Minute => "minute",
            DatePart::Hour => "hour",
            DatePart::Day => "day",
            DatePart::DayOfWeek => "dow",
            DatePart::IsoDayOfWeek => "isodow",
            DatePart::DayOfYear => "doy",
            DatePart::Week => "week",
            DatePart::Month => "month",
            DatePart::Quarter => "quarter",
            DatePart::Year => "year",
        }
    }

    fn extract(self, naive: &NaiveDateTime) -> i64 {
        let value = match self {
            DatePart::Microsecond => naive.nanosecond() / 1_000,
            DatePart::Millisecond => naive.nanosecond() / 1_000_000,
            DatePart::Second => naive.second(),
            DatePart::Minute => naive.minute(),
            DatePart::Hour => naive.hour(),
            DatePart::Day => naive.day(),
            DatePart::DayOfWeek => naive.weekday().num_days_from_sunday(),
            DatePart::IsoDayOfWeek => naive.weekday().number_from_monday(),
            DatePart::DayOfYear => naive.ordinal(),
            DatePart::Week => naive.iso_week().week(),
            DatePart::Month => naive.month(),
            DatePart::Quarter => (naive.month() - 1) / 3 + 1,
            DatePart::Year => return i64::from(naive.year()),
        };
        i64::from(value)
    }
}

impl FromStr for DatePart {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let part = match s.trim().to_ascii_lowercase().as_str() {
            "microsecond" | "microseconds" => DatePart::Microsecond,
            "millisecond" | "milliseconds" => DatePart::Millisecond,
            "second" | "seconds" => DatePart::Second,
            "minute" | "minutes" => DatePart::Minute,
            "hour" | "hours" => DatePart::Hour,
            "day" | "days" => DatePart::Day,
            "dow" | "day_of_week" => DatePart::DayOfWeek,
            "isodow" => DatePart::IsoDayOfWeek,
            "doy" | "day_of_year" => DatePart::DayOfYear,
            "week" | "weeks" | "isoweek" => DatePart::Week,
            "month" | "months" => DatePart::Month,
            "quarter" | "quarters" => DatePart::Quarter,
            "year" | "years" => DatePart::Year,
            _ => {
                return Err(TimestampParseError::UnknownUnit {
                    unit: s.to_string(),
                });
            }
        };
        Ok(part)
    }
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        let expected = Timestamp::from_unix_seconds(1_767_225_600).unwrap();
        assert_eq!(ts("2026-01-01"), expected);
        assert_eq!(ts("2026-01-01T00:00:00Z"), expected);
        assert_eq!(ts("2026-01-01T01:00:00+01:00"), expected);
        assert_eq!(ts("2026-01-01 00:00:00"), expected);
        assert_eq!(ts("  2026-01-01T00:00:00  "), expected);
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = ts("2025-10-17 12:34:56.250000");
        assert_eq!(parsed.as_datetime().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(TimestampParseError::Unrecognized { .. })
        ));
        assert!(Timestamp::parse("").is_err());
        assert!(Timestamp::parse("2026-13-01").is_err());
    }

    #[test]
    fn test_ordering() {
        let earlier = ts("2025-01-01");
        let later = ts("2025-01-02");
        assert!(earlier < later);
        assert_eq!(earlier.max(later), later);
    }

    #[test]
    fn test_interval_arithmetic() {
        let start = ts("2025-03-10T10:00:00Z");
        assert_eq!(
            start.checked_add_interval(Interval::days(1)).unwrap(),
            ts("2025-03-11T10:00:00Z")
        );
        assert_eq!(
            start.checked_sub_interval(Interval::seconds(30)).unwrap(),
            ts("2025-03-10T09:59:30Z")
        );
        assert_eq!(
            ts("2024-01-31").checked_add_interval(Interval::months(1)).unwrap(),
            ts("2024-02-29")
        );
    }

    #[test]
    fn test_interval_overflow_is_none() {
        let far = Timestamp::new(DateTime::<Utc>::MAX_UTC);
        assert!(far.checked_add_interval(Interval::days(1)).is_none());
    }

    #[test]
    fn test_trunc() {
        let t = ts("2025-10-17T13:45:12.5Z");
        assert_eq!(t.trunc(TimeUnit::Second).unwrap(), ts("2025-10-17T13:45:12Z"));
        assert_eq!(t.trunc(TimeUnit::Minute).unwrap(), ts("2025-10-17T13:45:00Z"));
        assert_eq!(t.trunc(TimeUnit::Hour).unwrap(), ts("2025-10-17T13:00:00Z"));
        assert_eq!(t.trunc(TimeUnit::Day).unwrap(), ts("2025-10-17"));
        // 2025-10-17 is a Friday
        assert_eq!(t.trunc(TimeUnit::Week).unwrap(), ts("2025-10-13"));
        assert_eq!(t.trunc(TimeUnit::Month).unwrap(), ts("2025-10-01"));
        assert_eq!(t.trunc(TimeUnit::Year).unwrap(), ts("2025-01-01"));
    }

    #[test]
    fn test_trunc_at_offset() {
        let offset = parse_utc_offset("+05:00").unwrap();
        // 21:30 UTC is already 02:30 the next day in UTC+5
        let t = ts("2025-10-17T21:30:00Z");
        assert_eq!(
            t.trunc_at(TimeUnit::Day, offset).unwrap(),
            ts("2025-10-17T19:00:00Z")
        );
        assert_eq!(t.trunc(TimeUnit::Day).unwrap(), ts("2025-10-17"));

        let west = parse_utc_offset("-03:30").unwrap();
        assert_eq!(
            t.trunc_at(TimeUnit::Hour, west).unwrap(),
            ts("2025-10-17T21:30:00Z")
        );
    }

    #[test]
    fn test_date_parts() {
        // Friday, day 290 of the year, ISO week 42
        let t = ts("2025-10-17T13:45:12.250Z");
        assert_eq!(t.part(DatePart::Year), 2025);
        assert_eq!(t.part(DatePart::Quarter), 4);
        assert_eq!(t.part(DatePart::Month), 10);
        assert_eq!(t.part(DatePart::Week), 42);
        assert_eq!(t.part(DatePart::Day), 17);
        assert_eq!(t.part(DatePart::DayOfYear), 290);
        assert_eq!(t.part(DatePart::DayOfWeek), 5);
        assert_eq!(t.part(DatePart::IsoDayOfWeek), 5);
        assert_eq!(t.part(DatePart::Hour), 13);
        assert_eq!(t.part(DatePart::Minute), 45);
        assert_eq!(t.part(DatePart::Second), 12);
        assert_eq!(t.part(DatePart::Millisecond), 250);

        let sunday = ts("2025-10-19");
        assert_eq!(sunday.part(DatePart::DayOfWeek), 0);
        assert_eq!(sunday.part(DatePart::IsoDayOfWeek), 7);
    }

    #[test]
    fn test_date_part_at_offset() {
        let t = ts("2025-10-17T21:30:00Z");
        let offset = parse_utc_offset("+0500").unwrap();
        assert_eq!(t.part_at(DatePart::Hour, offset), Some(2));
        assert_eq!(t.part_at(DatePart::Day, offset), Some(18));
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("utc").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("+05").unwrap().local_minus_utc(), 18_000);
        assert_eq!(parse_utc_offset("-03:30").unwrap().local_minus_utc(), -12_600);
        for bad in ["", "05:00", "+5", "+25:00", "+05:60", "+05-00", "+ab:cd"] {
            assert!(
                matches!(
                    parse_utc_offset(bad),
                    Err(TimestampParseError::InvalidOffset { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_date_part_parse() {
        assert_eq!("HOUR".parse::<DatePart>().unwrap(), DatePart::Hour);
        assert_eq!("dow".parse::<DatePart>().unwrap(), DatePart::DayOfWeek);
        assert!("fortnight".parse::<DatePart>().is_err());
    }

    #[test]
    fn test_time_unit_parse() {
        assert_eq!("Days".parse::<TimeUnit>().unwrap(), TimeUnit::Day);
        assert_eq!("month".parse::<TimeUnit>().unwrap(), TimeUnit::Month);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_system_time_conversion() {
        let now = SystemTime::now();
        let ts = Timestamp::from(now);
        assert_eq!(ts.to_system_time(), now);
    }

    #[test]
    fn test_serde_as_string() {
        let t = ts("2026-01-01");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"2026-01-01T00:00:00Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
