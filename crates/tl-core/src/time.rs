//! Timestamp normalization.
//!
//! Artifacts encode time in many ways: POSIX seconds, Java milliseconds,
//! WebKit microseconds, Cocoa seconds, or a broken-down calendar tuple in
//! host-local time.
//! [`normalize`] reduces all of them to a [`CanonicalTimestamp`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Seconds between the WebKit epoch (1601-01-01) and the POSIX epoch.
const WEBKIT_EPOCH_DELTA_SECONDS: i64 = 11_644_473_600;

/// Seconds between the POSIX epoch and the Cocoa epoch (2001-01-01).
const COCOA_EPOCH_DELTA_SECONDS: i64 = 978_307_200;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Largest UTC offset accepted in a time tuple (exclusive), in minutes.
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("negative epoch value {0} is not allowed")]
    NegativeEpoch(i64),
    #[error("unknown month name: {0:?}")]
    UnknownMonthName(String),
    #[error("month out of range: {0}")]
    MonthOutOfRange(u32),
    #[error("day {day} out of range for {year:04}-{month:02}")]
    DayOutOfRange { year: i32, month: u32, day: u32 },
    #[error("hour out of range: {0}")]
    HourOutOfRange(u32),
    #[error("minute out of range: {0}")]
    MinuteOutOfRange(u32),
    #[error("second out of range: {0}")]
    SecondOutOfRange(u32),
    #[error("unsupported fraction of second: {value} with {digits} digits")]
    InvalidFraction { value: u32, digits: u8 },
    #[error("UTC offset out of range: {0} minutes")]
    OffsetOutOfRange(i32),
    #[error("timestamp is outside the representable range")]
    OutOfRange,
}

/// Month component of a time tuple, as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Month {
    Number(u32),
    Name(String),
}

/// Fractional seconds with their original digit count (`"000002"` is 2 with 6 digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub value: u32,
    pub digits: u8,
}

impl Fraction {
    fn to_micros(self) -> Result<u32, TimeParseError> {
        let invalid = TimeParseError::InvalidFraction {
            value: self.value,
            digits: self.digits,
        };
        if !(1..=9).contains(&self.digits) || u64::from(self.value) >= 10u64.pow(u32::from(self.digits)) {
            return Err(invalid);
        }
        let micros = if self.digits <= 6 {
            self.value * 10u32.pow(6 - u32::from(self.digits))
        } else {
            self.value / 10u32.pow(u32::from(self.digits) - 6)
        };
        Ok(micros)
    }
}

/// Broken-down calendar time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeTuple {
    pub year: i32,
    pub month: Month,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub fraction: Option<Fraction>,
    /// Offset east of UTC, when the source states one.
    pub utc_offset_minutes: Option<i32>,
}

/// A time value exactly as an artifact encodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimeValue {
    EpochSeconds(i64),
    EpochMillis(i64),
    /// Microseconds since 1601-01-01 (Chrome/WebKit).
    WebKitMicros(i64),
    /// Microseconds since 2001-01-01 (Cocoa/Core Data).
    CocoaMicros(i64),
    Tuple(TimeTuple),
}

/// Maps textual month names to month numbers.
#[derive(Debug)]
pub struct MonthTable {
    names: &'static [(&'static str, u32)],
}

impl MonthTable {
    pub const ENGLISH_ABBREVIATED: Self = Self {
        names: &[
            ("jan", 1),
            ("feb", 2),
            ("mar", 3),
            ("apr", 4),
            ("may", 5),
            ("jun", 6),
            ("jul", 7),
            ("aug", 8),
            ("sep", 9),
            ("oct", 10),
            ("nov", 11),
            ("dec", 12),
        ],
    };

    /// Returns the month number for `name`, case-insensitively, or 0 when unknown.
    pub fn month_number(&self, name: &str) -> u32 {
        self.names
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map_or(0, |(_, number)| *number)
    }
}

/// Per-artifact normalization parameters.
#[derive(Debug, Clone, Copy)]
pub struct TimeHints {
    pub months: &'static MonthTable,
    pub allow_negative_epoch: bool,
}

impl TimeHints {
    pub const DEFAULT: Self = Self {
        months: &MonthTable::ENGLISH_ABBREVIATED,
        allow_negative_epoch: false,
    };
}

impl Default for TimeHints {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Unit of a [`CanonicalTimestamp`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Seconds,
    Millis,
    Micros,
}

impl Resolution {
    const fn micros_per_unit(self) -> i64 {
        match self {
            Self::Seconds => MICROS_PER_SECOND,
            Self::Millis => 1_000,
            Self::Micros => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Millis => "millis",
            Self::Micros => "micros",
        }
    }
}

/// The engine's single normalized time representation.
///
/// The value counts `resolution` units since 1970-01-01T00:00:00. For
/// local-time values that wall-clock reading is stored as if it were UTC and
/// `is_local_time` is set; consumers must not assume UTC for those.
///
/// Equality, ordering and hashing consider only the instant.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalTimestamp {
    resolution: Resolution,
    value: i64,
    is_local_time: bool,
}

impl CanonicalTimestamp {
    /// Builds a timestamp, rejecting instants chrono cannot represent.
    pub fn new(
        resolution: Resolution,
        value: i64,
        is_local_time: bool,
    ) -> Result<Self, TimeParseError> {
        let timestamp = Self {
            resolution,
            value,
            is_local_time,
        };
        timestamp
            .to_naive_datetime()
            .ok_or(TimeParseError::OutOfRange)?;
        Ok(timestamp)
    }

    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub const fn value(&self) -> i64 {
        self.value
    }

    pub const fn is_local_time(&self) -> bool {
        self.is_local_time
    }

    /// The raw epoch value in this timestamp's own resolution.
    pub const fn to_epoch(&self) -> i64 {
        self.value
    }

    fn as_micros(&self) -> i128 {
        i128::from(self.value) * i128::from(self.resolution.micros_per_unit())
    }

    /// The wall-clock reading: UTC for non-local values, local otherwise.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        let micros = i64::try_from(self.as_micros()).ok()?;
        let seconds = micros.div_euclid(MICROS_PER_SECOND);
        let nanos = u32::try_from(micros.rem_euclid(MICROS_PER_SECOND) * 1_000).ok()?;
        DateTime::from_timestamp(seconds, nanos).map(|dt| dt.naive_utc())
    }
}

impl PartialEq for CanonicalTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.as_micros() == other.as_micros()
    }
}

impl Eq for CanonicalTimestamp {}

impl PartialOrd for CanonicalTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_micros().cmp(&other.as_micros())
    }
}

impl Hash for CanonicalTimestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_micros().hash(state);
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(naive) = self.to_naive_datetime() else {
            return write!(f, "{} {}", self.value, self.resolution.as_str());
        };
        let pattern = match self.resolution {
            Resolution::Seconds => "%Y-%m-%dT%H:%M:%S",
            Resolution::Millis => "%Y-%m-%dT%H:%M:%S%.3f",
            Resolution::Micros => "%Y-%m-%dT%H:%M:%S%.6f",
        };
        write!(f, "{}", naive.format(pattern))?;
        if !self.is_local_time {
            f.write_str("Z")?;
        }
        Ok(())
    }
}

impl Serialize for CanonicalTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("CanonicalTimestamp", 4)?;
        state.serialize_field("resolution", &self.resolution)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("is_local_time", &self.is_local_time)?;
        state.serialize_field("iso", &self.to_string())?;
        state.end()
    }
}

/// Converts a raw time value into a [`CanonicalTimestamp`].
pub fn normalize(
    raw: &RawTimeValue,
    hints: &TimeHints,
) -> Result<CanonicalTimestamp, TimeParseError> {
    match raw {
        RawTimeValue::EpochSeconds(seconds) => {
            check_sign(*seconds, hints)?;
            CanonicalTimestamp::new(Resolution::Seconds, *seconds, false)
        }
        RawTimeValue::EpochMillis(millis) => {
            check_sign(*millis, hints)?;
            CanonicalTimestamp::new(Resolution::Millis, *millis, false)
        }
        RawTimeValue::WebKitMicros(micros) => {
            check_sign(*micros, hints)?;
            let posix = micros
                .checked_sub(WEBKIT_EPOCH_DELTA_SECONDS * MICROS_PER_SECOND)
                .ok_or(TimeParseError::OutOfRange)?;
            CanonicalTimestamp::new(Resolution::Micros, posix, false)
        }
        RawTimeValue::CocoaMicros(micros) => {
            let posix = micros
                .checked_add(COCOA_EPOCH_DELTA_SECONDS * MICROS_PER_SECOND)
                .ok_or(TimeParseError::OutOfRange)?;
            check_sign(posix, hints)?;
            CanonicalTimestamp::new(Resolution::Micros, posix, false)
        }
        RawTimeValue::Tuple(tuple) => normalize_tuple(tuple, hints.months),
    }
}

const fn check_sign(value: i64, hints: &TimeHints) -> Result<(), TimeParseError> {
    if value < 0 && !hints.allow_negative_epoch {
        return Err(TimeParseError::NegativeEpoch(value));
    }
    Ok(())
}

const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn normalize_tuple(
    tuple: &TimeTuple,
    months: &MonthTable,
) -> Result<CanonicalTimestamp, TimeParseError> {
    let month = match &tuple.month {
        Month::Number(number) => *number,
        Month::Name(name) => match months.month_number(name) {
            0 => return Err(TimeParseError::UnknownMonthName(name.clone())),
            number => number,
        },
    };
    if !(1..=12).contains(&month) {
        return Err(TimeParseError::MonthOutOfRange(month));
    }
    if tuple.day == 0 || tuple.day > days_in_month(tuple.year, month) {
        return Err(TimeParseError::DayOutOfRange {
            year: tuple.year,
            month,
            day: tuple.day,
        });
    }
    if tuple.hour > 23 {
        return Err(TimeParseError::HourOutOfRange(tuple.hour));
    }
    if tuple.minute > 59 {
        return Err(TimeParseError::MinuteOutOfRange(tuple.minute));
    }
    if tuple.second > 59 {
        return Err(TimeParseError::SecondOutOfRange(tuple.second));
    }
    let micros = tuple.fraction.map(Fraction::to_micros).transpose()?;

    let mut naive = NaiveDate::from_ymd_opt(tuple.year, month, tuple.day)
        .and_then(|date| {
            date.and_hms_micro_opt(
                tuple.hour,
                tuple.minute,
                tuple.second,
                micros.unwrap_or(0),
            )
        })
        .ok_or(TimeParseError::OutOfRange)?;

    let is_local_time = match tuple.utc_offset_minutes {
        Some(offset) => {
            if offset.unsigned_abs() >= MAX_OFFSET_MINUTES.unsigned_abs() {
                return Err(TimeParseError::OffsetOutOfRange(offset));
            }
            naive = naive
                .checked_sub_signed(Duration::minutes(i64::from(offset)))
                .ok_or(TimeParseError::OutOfRange)?;
            false
        }
        None => true,
    };

    let instant = naive.and_utc();
    if micros.is_some() {
        CanonicalTimestamp::new(Resolution::Micros, instant.timestamp_micros(), is_local_time)
    } else {
        CanonicalTimestamp::new(Resolution::Seconds, instant.timestamp(), is_local_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(year: i32, month: Month, day: u32, hms: (u32, u32, u32)) -> TimeTuple {
        TimeTuple {
            year,
            month,
            day,
            hour: hms.0,
            minute: hms.1,
            second: hms.2,
            fraction: None,
            utc_offset_minutes: None,
        }
    }

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn epoch_seconds_scale_without_calendar_math() {
        let ts = normalize(&RawTimeValue::EpochSeconds(1673), &TimeHints::DEFAULT).unwrap();
        assert_eq!(ts.resolution(), Resolution::Seconds);
        assert_eq!(ts.value(), 1673);
        assert_eq!(ts.to_epoch(), 1673);
        assert!(!ts.is_local_time());
        assert_eq!(ts.to_string(), "1970-01-01T00:27:53Z");
    }

    #[test]
    fn epoch_millis_keep_millisecond_resolution() {
        let ts =
            normalize(&RawTimeValue::EpochMillis(1_467_220_818_026), &TimeHints::DEFAULT).unwrap();
        assert_eq!(ts.resolution(), Resolution::Millis);
        assert_eq!(ts.to_epoch(), 1_467_220_818_026);
        assert_eq!(ts.to_string(), "2016-06-29T17:20:18.026Z");
    }

    #[test]
    fn webkit_micros_shift_to_posix_epoch() {
        let raw = RawTimeValue::WebKitMicros(WEBKIT_EPOCH_DELTA_SECONDS * MICROS_PER_SECOND + 5);
        let ts = normalize(&raw, &TimeHints::DEFAULT).unwrap();
        assert_eq!(ts.resolution(), Resolution::Micros);
        assert_eq!(ts.value(), 5);
        assert_eq!(ts.to_string(), "1970-01-01T00:00:00.000005Z");
    }

    #[test]
    fn cocoa_micros_shift_from_2001() {
        let raw = RawTimeValue::CocoaMicros(413_779_107_097_813);
        let ts = normalize(&raw, &TimeHints::DEFAULT).unwrap();
        assert_eq!(ts.resolution(), Resolution::Micros);
        assert_eq!(ts.to_string(), "2014-02-11T02:38:27.097813Z");

        let before_1970 =
            RawTimeValue::CocoaMicros(-(COCOA_EPOCH_DELTA_SECONDS + 1) * MICROS_PER_SECOND);
        assert!(matches!(
            normalize(&before_1970, &TimeHints::DEFAULT),
            Err(TimeParseError::NegativeEpoch(_))
        ));
        assert_eq!(
            normalize(&RawTimeValue::CocoaMicros(i64::MAX), &TimeHints::DEFAULT),
            Err(TimeParseError::OutOfRange)
        );
    }

    #[test]
    fn negative_epoch_rejected_unless_allowed() {
        let raw = RawTimeValue::EpochSeconds(-1);
        assert_eq!(
            normalize(&raw, &TimeHints::DEFAULT),
            Err(TimeParseError::NegativeEpoch(-1))
        );

        let hints = TimeHints {
            allow_negative_epoch: true,
            ..TimeHints::DEFAULT
        };
        let ts = normalize(&raw, &hints).unwrap();
        assert_eq!(ts.to_string(), "1969-12-31T23:59:59Z");
    }

    #[test]
    fn absurd_epoch_is_out_of_range() {
        let raw = RawTimeValue::EpochSeconds(i64::MAX);
        assert_eq!(
            normalize(&raw, &TimeHints::DEFAULT),
            Err(TimeParseError::OutOfRange)
        );
    }

    #[test]
    fn month_name_tuple_is_local_time() {
        let raw = RawTimeValue::Tuple(tuple(2016, Month::Name("jun".into()), 6, (18, 43, 28)));
        let ts = normalize(&raw, &TimeHints::DEFAULT).unwrap();

        assert!(ts.is_local_time());
        assert_eq!(ts.resolution(), Resolution::Seconds);
        assert_eq!(ts.to_naive_datetime(), Some(naive("2016-06-06 18:43:28")));
        assert_eq!(ts.to_string(), "2016-06-06T18:43:28");
    }

    #[test]
    fn month_names_are_case_insensitive() {
        assert_eq!(MonthTable::ENGLISH_ABBREVIATED.month_number("Jun"), 6);
        assert_eq!(MonthTable::ENGLISH_ABBREVIATED.month_number("DEC"), 12);
        assert_eq!(MonthTable::ENGLISH_ABBREVIATED.month_number("june"), 0);
    }

    #[test]
    fn unknown_month_name_fails_instead_of_month_zero() {
        let raw = RawTimeValue::Tuple(tuple(2016, Month::Name("foo".into()), 6, (18, 43, 28)));
        assert_eq!(
            normalize(&raw, &TimeHints::DEFAULT),
            Err(TimeParseError::UnknownMonthName("foo".into()))
        );
    }

    #[test]
    fn out_of_range_components_are_not_clamped() {
        let cases = [
            (
                tuple(2016, Month::Number(13), 1, (0, 0, 0)),
                TimeParseError::MonthOutOfRange(13),
            ),
            (
                tuple(2016, Month::Number(0), 1, (0, 0, 0)),
                TimeParseError::MonthOutOfRange(0),
            ),
            (
                tuple(2016, Month::Number(1), 32, (0, 0, 0)),
                TimeParseError::DayOutOfRange {
                    year: 2016,
                    month: 1,
                    day: 32,
                },
            ),
            (
                tuple(2015, Month::Number(2), 29, (0, 0, 0)),
                TimeParseError::DayOutOfRange {
                    year: 2015,
                    month: 2,
                    day: 29,
                },
            ),
            (
                tuple(2016, Month::Number(1), 1, (24, 0, 0)),
                TimeParseError::HourOutOfRange(24),
            ),
            (
                tuple(2016, Month::Number(1), 1, (0, 60, 0)),
                TimeParseError::MinuteOutOfRange(60),
            ),
            (
                tuple(2016, Month::Number(1), 1, (0, 0, 60)),
                TimeParseError::SecondOutOfRange(60),
            ),
        ];

        for (input, expected) in cases {
            let raw = RawTimeValue::Tuple(input);
            assert_eq!(normalize(&raw, &TimeHints::DEFAULT), Err(expected));
        }
    }

    #[test]
    fn leap_day_accepted_in_leap_year() {
        let raw = RawTimeValue::Tuple(tuple(2016, Month::Number(2), 29, (0, 0, 0)));
        assert!(normalize(&raw, &TimeHints::DEFAULT).is_ok());
    }

    #[test]
    fn fraction_gives_microsecond_resolution() {
        let mut input = tuple(2019, Month::Number(12), 31, (23, 59, 59));
        input.fraction = Some(Fraction {
            value: 2,
            digits: 6,
        });
        let ts = normalize(&RawTimeValue::Tuple(input), &TimeHints::DEFAULT).unwrap();

        assert_eq!(ts.resolution(), Resolution::Micros);
        assert_eq!(
            ts.to_naive_datetime(),
            Some(naive("2019-12-31 23:59:59.000002"))
        );
        assert_eq!(ts.to_string(), "2019-12-31T23:59:59.000002");
    }

    #[test]
    fn short_and_long_fractions_scale_to_micros() {
        let short = Fraction {
            value: 123,
            digits: 3,
        };
        assert_eq!(short.to_micros(), Ok(123_000));

        let long = Fraction {
            value: 123_456_789,
            digits: 9,
        };
        assert_eq!(long.to_micros(), Ok(123_456));

        let overflowing = Fraction {
            value: 1000,
            digits: 3,
        };
        assert!(overflowing.to_micros().is_err());
    }

    #[test]
    fn explicit_offset_shifts_to_utc() {
        let mut input = tuple(2020, Month::Number(3), 1, (12, 0, 0));
        input.utc_offset_minutes = Some(120);
        let ts = normalize(&RawTimeValue::Tuple(input), &TimeHints::DEFAULT).unwrap();

        assert!(!ts.is_local_time());
        assert_eq!(ts.to_string(), "2020-03-01T10:00:00Z");
    }

    #[test]
    fn offset_of_a_day_or_more_is_rejected() {
        let mut input = tuple(2020, Month::Number(3), 1, (12, 0, 0));
        input.utc_offset_minutes = Some(-1440);
        assert_eq!(
            normalize(&RawTimeValue::Tuple(input), &TimeHints::DEFAULT),
            Err(TimeParseError::OffsetOutOfRange(-1440))
        );
    }

    #[test]
    fn most_negative_offset_is_rejected() {
        let mut input = tuple(2020, Month::Number(3), 1, (12, 0, 0));
        input.utc_offset_minutes = Some(i32::MIN);
        assert_eq!(
            normalize(&RawTimeValue::Tuple(input), &TimeHints::DEFAULT),
            Err(TimeParseError::OffsetOutOfRange(i32::MIN))
        );
    }

    #[test]
    fn comparison_uses_instant_across_resolutions() {
        let seconds = CanonicalTimestamp::new(Resolution::Seconds, 1, false).unwrap();
        let millis = CanonicalTimestamp::new(Resolution::Millis, 1000, false).unwrap();
        let later = CanonicalTimestamp::new(Resolution::Micros, 1_000_001, false).unwrap();

        assert_eq!(seconds, millis);
        assert!(millis < later);
    }

    #[test]
    fn serializes_instant_and_locality() {
        let ts = CanonicalTimestamp::new(Resolution::Seconds, 1673, false).unwrap();
        let json = serde_json::to_value(ts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "resolution": "seconds",
                "value": 1673,
                "is_local_time": false,
                "iso": "1970-01-01T00:27:53Z",
            })
        );
    }
}
