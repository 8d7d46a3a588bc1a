//! Declarative field grammars.
//!
//! A [`Grammar`] is an ordered list of [`FieldSpec`]s applied left to right
//! against one logical unit of text. There is no backtracking: the first
//! matcher that fails aborts the unit with a [`MatchError`] naming the field.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::record::{ExtractedRecord, FieldValue};
use crate::time::{Fraction, Month, RawTimeValue, TimeTuple};

/// How a single field is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// ASCII digit run of `min..=max` characters, captured as an integer.
    Digits { min: usize, max: usize },
    /// ASCII alphabetic run of `min..=max` characters.
    Alpha { min: usize, max: usize },
    Literal(&'static str),
    /// Non-empty text up to (not including) the delimiter.
    Until(&'static str),
    /// Everything to the end of the unit, embedded newlines included.
    Rest { allow_empty: bool },
}

impl Matcher {
    /// Fixed-width digit run.
    pub const fn digits(width: usize) -> Self {
        Self::Digits {
            min: width,
            max: width,
        }
    }

    /// Any non-empty digit run.
    pub const fn integer() -> Self {
        Self::Digits {
            min: 1,
            max: usize::MAX,
        }
    }

    pub const fn alpha(width: usize) -> Self {
        Self::Alpha {
            min: width,
            max: width,
        }
    }

    fn apply(self, unit: &str, start: usize) -> Result<(FieldValue, usize), MatchFailure> {
        let rest = &unit[start..];
        match self {
            Self::Digits { min, max } => {
                let len = run_length(rest, max, |c| c.is_ascii_digit());
                if len < min {
                    return Err(MatchFailure::ExpectedDigits { min, max });
                }
                let digits = &rest[..len];
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| MatchFailure::IntegerOverflow(digits.to_string()))?;
                Ok((FieldValue::Int(value), start + len))
            }
            Self::Alpha { min, max } => {
                let len = run_length(rest, max, |c| c.is_ascii_alphabetic());
                if len < min {
                    return Err(MatchFailure::ExpectedAlpha { min, max });
                }
                Ok((FieldValue::from(&rest[..len]), start + len))
            }
            Self::Literal(text) => {
                if rest.starts_with(text) {
                    Ok((FieldValue::from(text), start + text.len()))
                } else {
                    Err(MatchFailure::ExpectedLiteral(text))
                }
            }
            Self::Until(delimiter) => match rest.find(delimiter) {
                None => Err(MatchFailure::DelimiterNotFound(delimiter)),
                Some(0) => Err(MatchFailure::Empty),
                Some(len) => Ok((FieldValue::from(&rest[..len]), start + len)),
            },
            Self::Rest { allow_empty } => {
                if rest.is_empty() && !allow_empty {
                    return Err(MatchFailure::Empty);
                }
                Ok((FieldValue::from(rest), unit.len()))
            }
        }
    }
}

/// Byte length of the leading run of at most `max` ASCII chars matching `accept`.
fn run_length(text: &str, max: usize, accept: impl Fn(u8) -> bool) -> usize {
    text.bytes().take(max).take_while(|b| accept(*b)).count()
}

fn skip_inline_whitespace(unit: &str, start: usize) -> usize {
    start
        + unit[start..]
            .bytes()
            .take_while(|b| *b == b' ' || *b == b'\t')
            .count()
}

/// One named step of a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub matcher: Matcher,
    /// Matched but not recorded.
    pub suppress: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, matcher: Matcher) -> Self {
        Self {
            name,
            matcher,
            suppress: false,
        }
    }

    /// An unnamed, suppressed literal separator.
    pub const fn literal(text: &'static str) -> Self {
        Self {
            name: "",
            matcher: Matcher::Literal(text),
            suppress: true,
        }
    }

    pub const fn suppressed(self) -> Self {
        Self {
            suppress: true,
            ..self
        }
    }

    fn label(&self) -> &'static str {
        match (self.name, self.matcher) {
            ("", Matcher::Literal(text)) => text,
            (name, _) => name,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchFailure {
    #[error("expected {min}..={max} digits")]
    ExpectedDigits { min: usize, max: usize },
    #[error("expected {min}..={max} letters")]
    ExpectedAlpha { min: usize, max: usize },
    #[error("expected {0:?}")]
    ExpectedLiteral(&'static str),
    #[error("delimiter {0:?} not found")]
    DelimiterNotFound(&'static str),
    #[error("empty value")]
    Empty,
    #[error("integer too large: {0}")]
    IntegerOverflow(String),
    #[error("unconsumed input")]
    TrailingInput,
}

/// A unit that does not satisfy its grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("field `{field}` at offset {offset}: {reason}")]
pub struct MatchError {
    /// Field name, or the literal text for unnamed separators.
    pub field: &'static str,
    pub offset: usize,
    pub reason: MatchFailure,
}

/// Where the year of a calendar tuple comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSource {
    Field(&'static str),
    /// Supplied by the scan (preamble or configured default).
    Scan,
}

/// Fraction-of-second field and its fixed digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractionField {
    pub field: &'static str,
    pub digits: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleLayout {
    pub year: YearSource,
    pub month: &'static str,
    pub day: &'static str,
    pub hour: &'static str,
    pub minute: &'static str,
    pub second: &'static str,
    pub fraction: Option<FractionField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLayout {
    EpochSeconds(&'static str),
    EpochMillis(&'static str),
    Tuple(TupleLayout),
}

impl TimeLayout {
    /// Captured fields consumed by this layout.
    pub fn components(&self) -> Vec<&'static str> {
        match self {
            Self::EpochSeconds(field) | Self::EpochMillis(field) => vec![*field],
            Self::Tuple(layout) => {
                let mut fields = Vec::with_capacity(7);
                if let YearSource::Field(year) = layout.year {
                    fields.push(year);
                }
                fields.extend([
                    layout.month,
                    layout.day,
                    layout.hour,
                    layout.minute,
                    layout.second,
                ]);
                if let Some(fraction) = layout.fraction {
                    fields.push(fraction.field);
                }
                fields
            }
        }
    }
}

/// Combines captured components into one raw time value stored under `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeField {
    pub name: &'static str,
    pub layout: TimeLayout,
}

/// How a logical unit is delimited in a line source.
#[derive(Debug, Clone, Copy)]
pub enum UnitBoundary {
    Line,
    /// A unit runs until the next line matching this pattern.
    Lookahead(&'static LazyLock<Regex>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("time `{time}` is missing component `{component}`")]
    MissingComponent {
        time: &'static str,
        component: &'static str,
    },
    #[error("time `{time}` has an invalid `{component}` component")]
    InvalidComponent {
        time: &'static str,
        component: &'static str,
    },
    #[error("no year available for time `{0}`")]
    MissingYear(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    pub fields: &'static [FieldSpec],
    pub times: &'static [TimeField],
    pub boundary: UnitBoundary,
}

impl Grammar {
    /// Applies the field matchers to `unit`, which must be consumed entirely
    /// apart from trailing whitespace.
    pub fn apply(&self, unit: &str) -> Result<ExtractedRecord, MatchError> {
        let mut record = ExtractedRecord::new();
        let mut cursor = 0;

        for spec in self.fields {
            cursor = skip_inline_whitespace(unit, cursor);
            let (value, end) = spec
                .matcher
                .apply(unit, cursor)
                .map_err(|reason| MatchError {
                    field: spec.label(),
                    offset: cursor,
                    reason,
                })?;
            if !spec.suppress {
                record.insert(spec.name, value);
            }
            cursor = end;
        }

        if !unit[cursor..].trim().is_empty() {
            return Err(MatchError {
                field: self.fields.last().map_or("", FieldSpec::label),
                offset: cursor,
                reason: MatchFailure::TrailingInput,
            });
        }
        Ok(record)
    }

    /// Applies the grammar and assembles its raw time values.
    pub fn extract(&self, unit: &str, year: Option<i32>) -> Result<ExtractedRecord, ExtractError> {
        let mut record = self.apply(unit)?;
        for time in self.times {
            let raw = assemble(time, &mut record, year)?;
            record.insert(time.name, raw);
        }
        Ok(record)
    }

    /// Names of fields recorded by [`Grammar::apply`].
    pub fn captured(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|spec| !spec.suppress)
            .map(|spec| spec.name)
    }
}

fn take_int(
    record: &mut ExtractedRecord,
    time: &'static str,
    component: &'static str,
) -> Result<i64, ExtractError> {
    match record.remove(component) {
        Some(FieldValue::Int(value)) => Ok(value),
        Some(_) => Err(ExtractError::InvalidComponent { time, component }),
        None => Err(ExtractError::MissingComponent { time, component }),
    }
}

fn take_narrow<T: TryFrom<i64>>(
    record: &mut ExtractedRecord,
    time: &'static str,
    component: &'static str,
) -> Result<T, ExtractError> {
    let value = take_int(record, time, component)?;
    T::try_from(value).map_err(|_| ExtractError::InvalidComponent { time, component })
}

fn assemble(
    time: &TimeField,
    record: &mut ExtractedRecord,
    scan_year: Option<i32>,
) -> Result<RawTimeValue, ExtractError> {
    let name = time.name;
    let raw = match time.layout {
        TimeLayout::EpochSeconds(field) => RawTimeValue::EpochSeconds(take_int(record, name, field)?),
        TimeLayout::EpochMillis(field) => RawTimeValue::EpochMillis(take_int(record, name, field)?),
        TimeLayout::Tuple(layout) => {
            let year = match layout.year {
                YearSource::Field(field) => take_narrow(record, name, field)?,
                YearSource::Scan => scan_year.ok_or(ExtractError::MissingYear(name))?,
            };
            let month = match record.remove(layout.month) {
                Some(FieldValue::Int(number)) => Month::Number(u32::try_from(number).map_err(
                    |_| ExtractError::InvalidComponent {
                        time: name,
                        component: layout.month,
                    },
                )?),
                Some(FieldValue::Str(text)) => Month::Name(text),
                Some(_) => {
                    return Err(ExtractError::InvalidComponent {
                        time: name,
                        component: layout.month,
                    });
                }
                None => {
                    return Err(ExtractError::MissingComponent {
                        time: name,
                        component: layout.month,
                    });
                }
            };
            let fraction = match layout.fraction {
                Some(spec) => Some(Fraction {
                    value: take_narrow(record, name, spec.field)?,
                    digits: spec.digits,
                }),
                None => None,
            };
            RawTimeValue::Tuple(TimeTuple {
                year,
                month,
                day: take_narrow(record, name, layout.day)?,
                hour: take_narrow(record, name, layout.hour)?,
                minute: take_narrow(record, name, layout.minute)?,
                second: take_narrow(record, name, layout.second)?,
                fraction,
                utc_offset_minutes: None,
            })
        }
    };
    Ok(raw)
}
