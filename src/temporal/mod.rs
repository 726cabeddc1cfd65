//! Display formatting of SAS date, time and datetime values.
//!
//! SAS stores dates as days and datetimes as seconds since 1960-01-01, and
//! times as seconds since midnight. Its calendar skips the leap days of the
//! years 4000 and 8000; values at or past those days are shifted by one day
//! each before any conversion to the proleptic Gregorian calendar.

mod date;
mod datetime;
pub mod decimal;
mod pattern;
mod time;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ::time::macros::datetime;
use ::time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

pub use self::date::DateFormat;
pub use self::datetime::DateTimeFormat;
pub use self::pattern::Pattern;
pub use self::time::TimeFormat;
use crate::value::Value;
use decimal::{Decimal, MAX_SCALE, Rounding};

pub const SECONDS_IN_MINUTE: i64 = 60;
pub const SECONDS_IN_HOUR: i64 = 3_600;
pub const SECONDS_IN_DAY: i64 = 86_400;

/// Seconds between 1960-01-01 and 1970-01-01.
const SAS_VS_EPOCH_DIFF_SECONDS: f64 = 315_619_200.0;

/// 29 February 4000 and 8000, which the SAS calendar does not have.
const SAS_DAYS_29FEB4000: f64 = 745_154.0;
const SAS_DAYS_29FEB8000: f64 = 2_206_123.0;
const SAS_SECONDS_29FEB4000: f64 = SAS_DAYS_29FEB4000 * 86_400.0;
const SAS_SECONDS_29FEB8000: f64 = SAS_DAYS_29FEB8000 * 86_400.0;

/// Calendar conversions beyond this many days are out of range for `time`.
const MAX_CONVERTIBLE_DAYS: f64 = 1.0e9;

const NANOS_SCALE: u32 = 9;

const SAS_EPOCH: PrimitiveDateTime = datetime!(1960-01-01 0:00);

/// Shape of temporal cells produced by the row materializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputDateType {
    /// The stored number, untouched.
    SasValue,
    /// Seconds since 1970-01-01 as a float.
    EpochSeconds,
    /// `Value::Date` for dates, `Value::DateTime` for datetimes.
    Temporal,
    /// UTC instant truncated to milliseconds.
    #[default]
    LegacyDate,
    /// Display string padded to the format width.
    SasFormat,
    /// Display string without padding.
    SasFormatTrim,
}

impl OutputDateType {
    const fn is_format(self) -> bool {
        matches!(self, Self::SasFormat | Self::SasFormatTrim)
    }
}

/// Renders a raw SAS number to its display string.
pub type FormatFn = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Shared behaviour of the three format families.
///
/// A variant only describes its default width and how it renders at a given
/// width and precision; width defaulting, precision clamping, fallback and
/// padding live here once.
pub trait TemporalFormat: Copy {
    fn default_width(self) -> u32;

    fn actual_width(self, width: u32) -> u32 {
        if width == 0 { self.default_width() } else { width }
    }

    /// Fraction digits that still fit next to the integral part.
    fn actual_precision(self, width: u32, precision: u32) -> u32 {
        let default = self.default_width();
        if width > default + 1 {
            (width - default - 1).min(precision)
        } else {
            0
        }
    }

    /// Renderer at the actual width and precision, `None` when the variant has
    /// no rendering of its own.
    fn internal(self, width: u32, precision: u32) -> Option<FormatFn>;

    /// Family default used for variants without a renderer.
    fn fallback(self) -> FormatFn;

    fn compile(self, width: u32, precision: u32) -> CompiledFormat {
        let width = self.actual_width(width);
        let precision = self.actual_precision(width, precision).min(MAX_SCALE);
        match self.internal(width, precision) {
            Some(render) => CompiledFormat {
                render,
                pad_to: Some(width as usize),
            },
            None => CompiledFormat {
                render: self.fallback(),
                pad_to: None,
            },
        }
    }
}

/// A format resolved for one width and precision.
#[derive(Clone)]
pub struct CompiledFormat {
    render: FormatFn,
    /// Field width for right alignment; fallback renderings are never padded.
    pad_to: Option<usize>,
}

impl CompiledFormat {
    #[must_use]
    pub fn format(&self, value: f64, trim: bool) -> String {
        let text = if value.is_nan() {
            ".".to_owned()
        } else {
            (self.render)(value)
        };
        match self.pad_to {
            Some(width) if !trim && text.len() < width => {
                let mut padded = " ".repeat(width - text.len());
                padded.push_str(&text);
                padded
            }
            _ => text,
        }
    }
}

impl fmt::Debug for CompiledFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFormat")
            .field("pad_to", &self.pad_to)
            .finish_non_exhaustive()
    }
}

pub(crate) fn overflow(width: u32) -> String {
    "*".repeat(width as usize)
}

#[must_use]
pub fn leap_days_fix(days: f64) -> f64 {
    let mut days = days;
    if days >= SAS_DAYS_29FEB4000 {
        if days >= SAS_DAYS_29FEB8000 {
            days += 1.0;
        }
        days += 1.0;
    }
    days
}

#[must_use]
pub fn leap_seconds_fix(seconds: f64) -> f64 {
    let mut seconds = seconds;
    if seconds >= SAS_SECONDS_29FEB4000 {
        if seconds >= SAS_SECONDS_29FEB8000 {
            seconds += 86_400.0;
        }
        seconds += 86_400.0;
    }
    seconds
}

#[must_use]
pub fn days_to_epoch_seconds(days: f64) -> f64 {
    days.mul_add(86_400.0, -SAS_VS_EPOCH_DIFF_SECONDS)
}

#[must_use]
pub fn seconds_to_epoch_seconds(seconds: f64) -> f64 {
    seconds - SAS_VS_EPOCH_DIFF_SECONDS
}

/// UTC instant for epoch seconds, truncated to whole milliseconds.
#[must_use]
pub fn epoch_seconds_to_timestamp(epoch_seconds: f64) -> Option<OffsetDateTime> {
    let millis = epoch_seconds * 1_000.0;
    if !millis.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = millis as i64;
    OffsetDateTime::UNIX_EPOCH.checked_add(Duration::milliseconds(millis))
}

/// Calendar date of a (leap-corrected) SAS day count; fractions are floored.
#[must_use]
pub fn days_to_date(days: f64) -> Option<Date> {
    let whole = days.floor();
    if !whole.is_finite() || whole.abs() > MAX_CONVERTIBLE_DAYS {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let whole = whole as i64;
    SAS_EPOCH.date().checked_add(Duration::days(whole))
}

/// Rounds seconds to `precision` fraction digits, half up for non-negative
/// values and half down for negative ones.
///
/// A value that rounds up onto midnight is pulled back below it, so
/// `23:59:59.999` never displays as the next day.
#[must_use]
pub fn round_seconds(seconds: f64, precision: u32) -> Option<Decimal> {
    let rounding = if seconds < 0.0 {
        Rounding::HalfDown
    } else {
        Rounding::HalfUp
    };
    let rounded = Decimal::from_f64(seconds, precision, rounding)?;
    if rounded.rem(SECONDS_IN_DAY).is_zero() && rounded.to_f64() > seconds {
        let nanosecond = Decimal::new(1, NANOS_SCALE);
        return Some(rounded.sub(nanosecond).rescale(precision, Rounding::Floor));
    }
    Some(rounded)
}

/// Wall-clock datetime of (leap-corrected) SAS seconds rounded to `precision`.
#[must_use]
pub fn seconds_to_datetime(seconds: f64, precision: u32) -> Option<PrimitiveDateTime> {
    let rounded = round_seconds(seconds, precision.min(NANOS_SCALE))?;
    let whole = rounded.floor();
    let fraction = rounded
        .sub(Decimal::from_int(whole))
        .rescale(NANOS_SCALE, Rounding::Floor);
    let nanos = i64::try_from(fraction.unscaled()).ok()?;
    SAS_EPOCH
        .checked_add(Duration::seconds(whole))?
        .checked_add(Duration::nanoseconds(nanos))
}

/// Converts raw temporal numbers according to an [`OutputDateType`], caching
/// one compiled renderer per family, format name, width and precision.
#[derive(Debug, Default)]
pub struct TemporalFormatter {
    date_formats: HashMap<String, CompiledFormat>,
    time_formats: HashMap<String, CompiledFormat>,
    datetime_formats: HashMap<String, CompiledFormat>,
}

fn cache_key(name: &str, width: u32, precision: u32) -> String {
    format!("{name}{width}.{precision}")
}

impl TemporalFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header timestamps: leap-corrected SAS seconds as a UTC instant.
    #[must_use]
    pub fn format_seconds_as_timestamp(seconds: f64) -> Option<OffsetDateTime> {
        epoch_seconds_to_timestamp(seconds_to_epoch_seconds(leap_seconds_fix(seconds)))
    }

    #[must_use]
    pub fn is_date_format(name: &str) -> bool {
        DateFormat::from_name(name).is_some()
    }

    #[must_use]
    pub fn is_time_format(name: &str) -> bool {
        TimeFormat::from_name(name).is_some()
    }

    #[must_use]
    pub fn is_datetime_format(name: &str) -> bool {
        DateTimeFormat::from_name(name).is_some()
    }

    pub fn format_sas_date(
        &mut self,
        days: f64,
        output: OutputDateType,
        name: &str,
        width: u32,
        precision: u32,
    ) -> Value {
        if let Some(early) = Self::untouched(days, output) {
            return early;
        }
        let days = leap_days_fix(days);
        match output {
            OutputDateType::EpochSeconds => Value::Float(days_to_epoch_seconds(days)),
            OutputDateType::Temporal => days_to_date(days).map_or(Value::Missing, Value::Date),
            OutputDateType::SasFormat | OutputDateType::SasFormatTrim => {
                let compiled = self
                    .date_formats
                    .entry(cache_key(name, width, precision))
                    .or_insert_with(|| match DateFormat::from_name(name) {
                        Some(format) => format.compile(width, precision),
                        None => DateFormat::Date.compile(0, 0),
                    });
                Value::Str(compiled.format(days, output == OutputDateType::SasFormatTrim))
            }
            OutputDateType::LegacyDate | OutputDateType::SasValue => {
                epoch_seconds_to_timestamp(days_to_epoch_seconds(days))
                    .map_or(Value::Missing, Value::Timestamp)
            }
        }
    }

    pub fn format_sas_time(
        &mut self,
        seconds: f64,
        output: OutputDateType,
        name: &str,
        width: u32,
        precision: u32,
    ) -> Value {
        if let Some(early) = Self::untouched(seconds, output) {
            return early;
        }
        if output.is_format() {
            let compiled = self
                .time_formats
                .entry(cache_key(name, width, precision))
                .or_insert_with(|| match TimeFormat::from_name(name) {
                    Some(format) => format.compile(width, precision),
                    None => TimeFormat::Time.compile(0, 0),
                });
            return Value::Str(compiled.format(seconds, output == OutputDateType::SasFormatTrim));
        }
        // Whole seconds stay integral, anything else is passed on as a float.
        #[allow(clippy::cast_possible_truncation)]
        let whole = seconds as i64;
        #[allow(clippy::cast_precision_loss)]
        let integral = seconds.fract() == 0.0 && whole as f64 == seconds;
        if integral {
            Value::Int64(whole)
        } else {
            Value::Float(seconds)
        }
    }

    pub fn format_sas_datetime(
        &mut self,
        seconds: f64,
        output: OutputDateType,
        name: &str,
        width: u32,
        precision: u32,
    ) -> Value {
        if let Some(early) = Self::untouched(seconds, output) {
            return early;
        }
        let seconds = leap_seconds_fix(seconds);
        match output {
            OutputDateType::EpochSeconds => Value::Float(seconds_to_epoch_seconds(seconds)),
            OutputDateType::Temporal => seconds_to_datetime(seconds, NANOS_SCALE)
                .map_or(Value::Missing, Value::DateTime),
            OutputDateType::SasFormat | OutputDateType::SasFormatTrim => {
                let compiled = self
                    .datetime_formats
                    .entry(cache_key(name, width, precision))
                    .or_insert_with(|| match DateTimeFormat::from_name(name) {
                        Some(format) => format.compile(width, precision),
                        None => DateTimeFormat::DateTime.compile(0, 0),
                    });
                Value::Str(compiled.format(seconds, output == OutputDateType::SasFormatTrim))
            }
            OutputDateType::LegacyDate | OutputDateType::SasValue => {
                epoch_seconds_to_timestamp(seconds_to_epoch_seconds(seconds))
                    .map_or(Value::Missing, Value::Timestamp)
            }
        }
    }

    /// Raw passthrough and missing values, which bypass every conversion.
    fn untouched(value: f64, output: OutputDateType) -> Option<Value> {
        if output == OutputDateType::SasValue {
            return Some(if value.is_nan() {
                Value::Missing
            } else {
                Value::Float(value)
            });
        }
        if value.is_nan() {
            return Some(if output.is_format() {
                Value::Str(".".to_owned())
            } else {
                Value::Missing
            });
        }
        None
    }
}
