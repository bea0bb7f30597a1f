use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// Errors produced while parsing an interval literal such as `'1W'` or `'2 hours 30min'`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalParseError {
    #[error("empty interval")]
    Empty,

    #[error("malformed interval '{input}': {reason}")]
    Malformed { input: String, reason: String },

    #[error("unknown interval unit '{unit}'")]
    UnknownUnit { unit: String },

    #[error("ambiguous interval unit '{unit}' (use 'min' for minutes or 'mon' for months)")]
    AmbiguousUnit { unit: String },

    #[error("interval '{input}' is out of range")]
    Overflow { input: String },
}

/// A signed, calendar-aware duration.
///
/// Months and days are kept apart from the fixed-length part because their
/// length depends on the instant they are applied to.
///
/// Equality is structural: `Interval::days(1)` and `Interval::hours(24)`
/// are different values even though they often shift a timestamp equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub nanos: i64,
}

impl Interval {
    pub const ZERO: Interval = Interval::new(0, 0, 0);

    pub const fn new(months: i32, days: i32, nanos: i64) -> Self {
        Self {
            months,
            days,
            nanos,
        }
    }

    /// `years` × 12 months.
    ///
    /// # Panics
    ///
    /// Panics when the month count overflows; see [`Interval::try_years`].
    pub const fn years(years: i32) -> Self {
        match Self::try_years(years) {
            Some(interval) => interval,
            None => panic!("Interval::years out of range"),
        }
    }

    pub const fn try_years(years: i32) -> Option<Self> {
        match years.checked_mul(12) {
            Some(months) => Some(Self::new(months, 0, 0)),
            None => None,
        }
    }

    pub const fn months(months: i32) -> Self {
        Self::new(months, 0, 0)
    }

    /// # Panics
    ///
    /// Panics when the day count overflows; see [`Interval::try_weeks`].
    pub const fn weeks(weeks: i32) -> Self {
        match Self::try_weeks(weeks) {
            Some(interval) => interval,
            None => panic!("Interval::weeks out of range"),
        }
    }

    pub const fn try_weeks(weeks: i32) -> Option<Self> {
        match weeks.checked_mul(7) {
            Some(days) => Some(Self::new(0, days, 0)),
            None => None,
        }
    }

    pub const fn days(days: i32) -> Self {
        Self::new(0, days, 0)
    }

    /// # Panics
    ///
    /// Panics when the nanosecond count overflows; see [`Interval::try_hours`].
    pub const fn hours(hours: i64) -> Self {
        match Self::try_hours(hours) {
            Some(interval) => interval,
            None => panic!("Interval::hours out of range"),
        }
    }

    pub const fn try_hours(hours: i64) -> Option<Self> {
        Self::try_scaled(hours, NANOS_PER_HOUR)
    }

    /// # Panics
    ///
    /// Panics when the nanosecond count overflows; see [`Interval::try_minutes`].
    pub const fn minutes(minutes: i64) -> Self {
        match Self::try_minutes(minutes) {
            Some(interval) => interval,
            None => panic!("Interval::minutes out of range"),
        }
    }

    pub const fn try_minutes(minutes: i64) -> Option<Self> {
        Self::try_scaled(minutes, NANOS_PER_MINUTE)
    }

    /// # Panics
    ///
    /// Panics when the nanosecond count overflows; see [`Interval::try_seconds`].
    pub const fn seconds(seconds: i64) -> Self {
        match Self::try_seconds(seconds) {
            Some(interval) => interval,
            None => panic!("Interval::seconds out of range"),
        }
    }

    pub const fn try_seconds(seconds: i64) -> Option<Self> {
        Self::try_scaled(seconds, NANOS_PER_SECOND)
    }

    /// # Panics
    ///
    /// Panics when the nanosecond count overflows; see [`Interval::try_millis`].
    pub const fn millis(millis: i64) -> Self {
        match Self::try_millis(millis) {
            Some(interval) => interval,
            None => panic!("Interval::millis out of range"),
        }
    }

    pub const fn try_millis(millis: i64) -> Option<Self> {
        Self::try_scaled(millis, NANOS_PER_MILLI)
    }

    const fn try_scaled(amount: i64, nanos_per_unit: i64) -> Option<Self> {
        match amount.checked_mul(nanos_per_unit) {
            Some(nanos) => Some(Self::new(0, 0, nanos)),
            None => None,
        }
    }

    /// Fixed-length interval from a std duration. `None` if it does not fit.
    pub fn from_duration(duration: Duration) -> Option<Self> {
        i64::try_from(duration.as_nanos())
            .ok()
            .map(|nanos| Self::new(0, 0, nanos))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn checked_add(self, other: Interval) -> Option<Self> {
        Some(Self {
            months: self.months.checked_add(other.months)?,
            days: self.days.checked_add(other.days)?,
            nanos: self.nanos.checked_add(other.nanos)?,
        })
    }

    pub fn checked_sub(self, other: Interval) -> Option<Self> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_neg(self) -> Option<Self> {
        Some(Self {
            months: self.months.checked_neg()?,
            days: self.days.checked_neg()?,
            nanos: self.nanos.checked_neg()?,
        })
    }

    /// Parse the body of an `INTERVAL '...'` literal.
    ///
    /// The body is one or more `<signed integer><unit>` terms; whitespace is
    /// allowed between the number and its unit and between terms. Units are
    /// case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellwhen_types::interval::Interval;
    ///
    /// assert_eq!(Interval::parse("1W").unwrap(), Interval::weeks(1));
    /// assert_eq!(Interval::parse("1d").unwrap(), Interval::days(1));
    /// assert_eq!(
    ///     Interval::parse("2 hours 30min").unwrap(),
    ///     Interval::minutes(150)
    /// );
    /// assert!(Interval::parse("5m").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, IntervalParseError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(IntervalParseError::Empty);
        }

        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut total = Interval::ZERO;

        while pos < bytes.len() {
            let number_start = pos;
            if bytes[pos] == b'-' || bytes[pos] == b'+' {
                pos += 1;
            }
            let digits_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == digits_start {
                return Err(IntervalParseError::Malformed {
                    input: input.to_string(),
                    reason: format!("expected a number at offset {}", number_start),
                });
            }
            let amount: i64 =
                text[number_start..pos]
                    .parse()
                    .map_err(|_| IntervalParseError::Overflow {
                        input: input.to_string(),
                    })?;

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            let unit_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
                pos += 1;
            }
            if pos == unit_start {
                return Err(IntervalParseError::Malformed {
                    input: input.to_string(),
                    reason: format!("missing unit after '{}'", &text[number_start..pos]),
                });
            }

            let term = Self::term(amount, &text[unit_start..pos], input)?;
            total = total
                .checked_add(term)
                .ok_or_else(|| IntervalParseError::Overflow {
                    input: input.to_string(),
                })?;

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
        }

        Ok(total)
    }

    fn term(amount: i64, unit: &str, input: &str) -> Result<Self, IntervalParseError> {
        let overflow = || IntervalParseError::Overflow {
            input: input.to_string(),
        };
        let narrow = |value: i64| i32::try_from(value).map_err(|_| overflow());
        let scaled = |factor: i64| amount.checked_mul(factor).ok_or_else(overflow);

        let interval = match unit.to_ascii_lowercase().as_str() {
            "y" | "yr" | "year" | "years" => Self::months(narrow(scaled(12)?)?),
            "mon" | "month" | "months" => Self::months(narrow(amount)?),
            "w" | "week" | "weeks" => Self::days(narrow(scaled(7)?)?),
            "d" | "day" | "days" => Self::days(narrow(amount)?),
            "h" | "hr" | "hour" | "hours" => Self::new(0, 0, scaled(NANOS_PER_HOUR)?),
            "min" | "mins" | "minute" | "minutes" => Self::new(0, 0, scaled(NANOS_PER_MINUTE)?),
            "s" | "sec" | "secs" | "second" | "seconds" => {
                Self::new(0, 0, scaled(NANOS_PER_SECOND)?)
            }
            "ms" | "millisecond" | "milliseconds" => Self::new(0, 0, scaled(NANOS_PER_MILLI)?),
            "us" | "microsecond" | "microseconds" => Self::new(0, 0, scaled(NANOS_PER_MICRO)?),
            "ns" | "nanosecond" | "nanoseconds" => Self::new(0, 0, amount),
            "m" => {
                return Err(IntervalParseError::AmbiguousUnit {
                    unit: unit.to_string(),
                });
            }
            _ => {
                return Err(IntervalParseError::UnknownUnit {
                    unit: unit.to_string(),
                });
            }
        };
        Ok(interval)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0s");
        }

        let mut terms = Vec::with_capacity(3);
        if self.months != 0 {
            terms.push(format!("{}mon", self.months));
        }
        if self.days != 0 {
            terms.push(format!("{}d", self.days));
        }
        if self.nanos != 0 {
            let nanos = self.nanos;
            let term = if nanos % NANOS_PER_SECOND == 0 {
                format!("{}s", nanos / NANOS_PER_SECOND)
            } else if nanos % NANOS_PER_MILLI == 0 {
                format!("{}ms", nanos / NANOS_PER_MILLI)
            } else if nanos % NANOS_PER_MICRO == 0 {
                format!("{}us", nanos / NANOS_PER_MICRO)
            } else {
                format!("{}ns", nanos)
            };
            terms.push(term);
        }
        f.write_str(&terms.join(" "))
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Interval::parse(&text).map_err(serde::de::Error::custom)
    }
}
