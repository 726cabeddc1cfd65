use std::sync::Arc;

use super::decimal::{Decimal, Rounding};
use super::{
    FormatFn, SECONDS_IN_DAY, SECONDS_IN_HOUR, SECONDS_IN_MINUTE, TemporalFormat, overflow,
    round_seconds,
};

/// Time-of-day display formats; raw values are seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    Time,
    Mmss,
    Hhmm,
    Hour,
    TimeAmPm,
    E8601Lz,
    E8601Tm,
}

impl TimeFormat {
    pub const ALL: [Self; 7] = [
        Self::Time,
        Self::Mmss,
        Self::Hhmm,
        Self::Hour,
        Self::TimeAmPm,
        Self::E8601Lz,
        Self::E8601Tm,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Time => "TIME",
            Self::Mmss => "MMSS",
            Self::Hhmm => "HHMM",
            Self::Hour => "HOUR",
            Self::TimeAmPm => "TIMEAMPM",
            Self::E8601Lz => "E8601LZ",
            Self::E8601Tm => "E8601TM",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.name() == name)
    }

    pub(super) fn fallback_format() -> FormatFn {
        Arc::new(|seconds| time(seconds, 8, 0))
    }
}

impl TemporalFormat for TimeFormat {
    fn default_width(self) -> u32 {
        match self {
            Self::Time | Self::E8601Tm => 8,
            Self::Mmss | Self::Hhmm => 5,
            Self::Hour => 2,
            Self::TimeAmPm => 11,
            Self::E8601Lz => 0,
        }
    }

    fn actual_precision(self, width: u32, precision: u32) -> u32 {
        match self {
            Self::E8601Tm if width > 8 => (width - 8).min(precision),
            Self::E8601Tm => 0,
            _ => precision,
        }
    }

    fn internal(self, width: u32, precision: u32) -> Option<FormatFn> {
        let render: FormatFn = match self {
            Self::Time => Arc::new(move |seconds| time(seconds, width, precision)),
            Self::Mmss => Arc::new(move |seconds| minutes_seconds(seconds, width, precision)),
            Self::Hhmm => Arc::new(move |seconds| hours_minutes(seconds, width, precision)),
            Self::Hour => Arc::new(move |seconds| hours(seconds, width, precision)),
            Self::E8601Tm => Arc::new(move |seconds| iso_time(seconds, width, precision)),
            Self::TimeAmPm | Self::E8601Lz => return None,
        };
        Some(render)
    }

    fn fallback(self) -> FormatFn {
        Self::fallback_format()
    }
}

fn to_digits(value: i64) -> String {
    itoa::Buffer::new().format(value).to_owned()
}

/// `:` before two-character parts, `:0` before single digits. Parts whose
/// second character is the decimal point count as single digits.
fn separator(part: &str) -> &'static str {
    if part.len() > 1 && part.as_bytes()[1] != b'.' {
        ":"
    } else {
        ":0"
    }
}

/// `TIMEw.d`: `h:mm:ss.ss`, dropping fraction digits when rounding adds an
/// hour digit that no longer fits.
fn time(seconds: f64, width: u32, precision: u32) -> String {
    let width = width as usize;
    let negative = seconds < 0.0;
    let min_integral = if negative { "-0:00:00".len() } else { "0:00:00".len() };
    let mut precision = if width > min_integral {
        (width - min_integral).min(precision as usize)
    } else {
        0
    };

    let (hours, rest) = loop {
        #[allow(clippy::cast_possible_truncation)]
        let Some(total) = Decimal::from_f64(seconds.abs(), precision as u32, Rounding::HalfUp)
        else {
            return overflow(width as u32);
        };
        let (hours, rest) = total.div_rem(SECONDS_IN_HOUR);
        if precision == 0 || to_digits(hours).len() + min_integral + precision <= width {
            break (hours, rest);
        }
        precision -= 1;
    };

    let mut hh = to_digits(hours);
    if negative {
        hh.insert(0, '-');
    }
    if hh.len() > width {
        return "*".repeat(width);
    }
    if hh.len() + 3 > width {
        return hh;
    }
    let (minutes, rest) = rest.div_rem(SECONDS_IN_MINUTE);
    let mm = to_digits(minutes);
    let hhmm = format!("{hh}{}{mm}", if mm.len() > 1 { ":" } else { ":0" });
    if hhmm.len() + 3 > width {
        return hhmm;
    }
    let ss = rest.to_string();
    format!("{hhmm}{}{ss}", separator(&ss))
}

/// `MMSSw.d`: minutes and seconds since midnight.
fn minutes_seconds(seconds: f64, width: u32, precision: u32) -> String {
    let width = width as usize;
    let Some(total) = Decimal::from_f64(seconds.abs(), precision, Rounding::HalfUp) else {
        return "**".to_owned();
    };
    let (minutes, rest) = total.div_rem(SECONDS_IN_MINUTE);
    let mut mm = to_digits(minutes);
    if seconds < 0.0 {
        mm.insert(0, '-');
    }
    if mm.len() > width {
        return "**".to_owned();
    }
    if mm.len() + 3 > width {
        return mm;
    }
    let ss = rest.to_string();
    let mut mmss = format!("{mm}{}{ss}", separator(&ss));
    mmss.truncate(width);
    mmss
}

/// `HHMMw.d`: hours and minutes, the fraction applying to minutes.
fn hours_minutes(seconds: f64, width: u32, precision: u32) -> String {
    let width = width as usize;
    let Some(total) =
        Decimal::from_f64_div(seconds.abs(), 60, precision, Rounding::HalfUp)
    else {
        return "**".to_owned();
    };
    let (hours, rest) = total.div_rem(SECONDS_IN_MINUTE);
    let mut hh = to_digits(hours);
    if seconds < 0.0 {
        hh.insert(0, '-');
    }
    if hh.len() > width {
        return "**".to_owned();
    }
    if hh.len() + 3 > width {
        return hh;
    }
    let mm = rest.to_string();
    let mut hhmm = format!("{hh}{}{mm}", separator(&mm));
    hhmm.truncate(width);
    hhmm
}

/// `HOURw.d`: hours with a decimal fraction.
fn hours(seconds: f64, width: u32, precision: u32) -> String {
    let width_chars = width as usize;
    let raw = (seconds / 3_600.0).abs();
    let Some(mut hours) = Decimal::from_f64(raw, precision, Rounding::HalfUp) else {
        return "**".to_owned();
    };
    let leading_fraction = width.checked_sub(precision) == Some(1);

    let mut adjusted = precision;
    while adjusted > 0 && hours.to_string().len() > width_chars {
        if hours.trunc() == 0 && leading_fraction {
            break;
        }
        adjusted -= 1;
        match Decimal::from_f64(raw, adjusted, Rounding::HalfUp) {
            Some(rounded) => hours = rounded,
            None => return "**".to_owned(),
        }
    }

    let text = hours.to_string();
    // ".5" for HOUR2.1: no leading zero when only the fraction fits.
    if precision > 0 && hours.trunc() == 0 && leading_fraction {
        return text[1..].to_owned();
    }
    let text = if width > 2 && text.len() > width_chars {
        e_notation(hours, width_chars)
    } else {
        Some(text)
    };
    match text {
        Some(text) if text.len() <= width_chars => text,
        _ => "**".to_owned(),
    }
}

/// Longest `dE<exp>` rendering of `hours` that fits into `width`, growing the
/// mantissa one digit at a time.
fn e_notation(hours: Decimal, width: usize) -> Option<String> {
    let value = hours.to_f64();
    let mut best = None;
    for digits in 1.. {
        let candidate = scientific(value, digits);
        if candidate.len() > width {
            break;
        }
        best = Some(candidate);
        if digits > 17 {
            break;
        }
    }
    best
}

/// `value` with `digits` significant integral digits followed by `E` and the
/// exponent, e.g. `12E3` for 12345 at two digits.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scientific(value: f64, digits: i32) -> String {
    if value == 0.0 {
        return format!("{}E0", "0".repeat(digits as usize));
    }
    let magnitude = value.abs().log10().floor() as i32;
    let exponent = magnitude - (digits - 1);
    let mantissa = (value / 10f64.powi(exponent)).round();
    // Rounding can carry into an extra digit (9.6 -> 10).
    let (mantissa, exponent) = if mantissa >= 10f64.powi(digits) {
        ((mantissa / 10.0).round(), exponent + 1)
    } else {
        (mantissa, exponent)
    };
    format!("{mantissa:.0}E{exponent}")
}

/// `E8601TMw.d`: ISO-8601 extended time `hh:mm:ss.fff` for values within one day.
fn iso_time(seconds: f64, width: u32, precision: u32) -> String {
    if seconds < 0.0 || seconds > 86_400.0 {
        return "*".repeat(width as usize);
    }
    let day_seconds = |precision: u32| {
        round_seconds(seconds, precision).map(|rounded| rounded.rem(SECONDS_IN_DAY))
    };
    clock(width, precision, day_seconds, false)
}

/// Shared `hh:mm:ss.fff` layout of `TOD` and `E8601TM`.
///
/// When rounding reaches two hour digits and the fraction exactly fills the
/// width, one fraction digit is given up for the extra hour digit.
pub(super) fn clock(
    width: u32,
    precision: u32,
    day_seconds: impl Fn(u32) -> Option<Decimal>,
    cut_short: bool,
) -> String {
    let Some(mut seconds) = day_seconds(precision) else {
        return overflow(width);
    };
    let mut adjusted = precision;
    let (hours, _) = seconds.div_rem(SECONDS_IN_HOUR);
    if hours >= 10 && precision > 0 && width.checked_sub(precision) == Some(8) {
        adjusted = precision - 1;
        match day_seconds(adjusted) {
            Some(rounded) => seconds = rounded,
            None => return overflow(width),
        }
    }
    let (hours, rest) = seconds.div_rem(SECONDS_IN_HOUR);

    let width = width as usize;
    let adjusted_digits = adjusted as usize;
    let mut hh = to_digits(hours);
    let unpadded = width == 4
        || width == 7
        || (adjusted > 0 && width.checked_sub(8) == Some(adjusted_digits));
    if hh.len() == 1 && !unpadded {
        hh.insert(0, '0');
    }
    if cut_short && hh.len() + 3 > width {
        return hh;
    }

    let (minutes, rest) = rest.div_rem(SECONDS_IN_MINUTE);
    let mm = to_digits(minutes);
    let hhmm = format!("{hh}{}{mm}", if mm.len() == 1 { ":0" } else { ":" });
    if cut_short && hhmm.len() + 3 > width {
        return hhmm;
    }

    let ss = to_digits(rest.trunc());
    let hhmmss = format!("{hhmm}{}{ss}", if ss.len() == 1 { ":0" } else { ":" });
    if adjusted == 0 || hhmmss.len() + adjusted_digits > width {
        return hhmmss;
    }
    let digits = adjusted_digits.min(width - hhmmss.len());
    format!("{hhmmss}.{}", rest.fraction_digits(digits))
}
