use std::sync::Arc;

use super::decimal::Decimal;
use super::pattern::Pattern;
use super::time::clock;
use super::{FormatFn, SECONDS_IN_DAY, TemporalFormat, overflow, round_seconds, seconds_to_datetime};

/// Date-and-time display formats; raw values are seconds since 1960-01-01T00:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeFormat {
    DateTime,
    B8601Dn,
    B8601Dt,
    B8601Dx,
    B8601Dz,
    B8601Lx,
    E8601Dn,
    E8601Dt,
    E8601Dx,
    E8601Dz,
    E8601Lx,
    DateAmPm,
    DtDate,
    DtMonyy,
    DtWkdatx,
    DtYear,
    MdyAmPm,
    Tod,
}

impl DateTimeFormat {
    pub const ALL: [Self; 18] = [
        Self::DateTime,
        Self::B8601Dn,
        Self::B8601Dt,
        Self::B8601Dx,
        Self::B8601Dz,
        Self::B8601Lx,
        Self::E8601Dn,
        Self::E8601Dt,
        Self::E8601Dx,
        Self::E8601Dz,
        Self::E8601Lx,
        Self::DateAmPm,
        Self::DtDate,
        Self::DtMonyy,
        Self::DtWkdatx,
        Self::DtYear,
        Self::MdyAmPm,
        Self::Tod,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DateTime => "DATETIME",
            Self::B8601Dn => "B8601DN",
            Self::B8601Dt => "B8601DT",
            Self::B8601Dx => "B8601DX",
            Self::B8601Dz => "B8601DZ",
            Self::B8601Lx => "B8601LX",
            Self::E8601Dn => "E8601DN",
            Self::E8601Dt => "E8601DT",
            Self::E8601Dx => "E8601DX",
            Self::E8601Dz => "E8601DZ",
            Self::E8601Lx => "E8601LX",
            Self::DateAmPm => "DATEAMPM",
            Self::DtDate => "DTDATE",
            Self::DtMonyy => "DTMONYY",
            Self::DtWkdatx => "DTWKDATX",
            Self::DtYear => "DTYEAR",
            Self::MdyAmPm => "MDYAMPM",
            Self::Tod => "TOD",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.name() == name)
    }

    pub(super) fn fallback_format() -> FormatFn {
        pattern_fn(&datetime_pattern(16, 0), 0, true, 16)
    }

    fn pattern(self, width: u32, precision: u32) -> Option<String> {
        let pattern = match self {
            Self::DateTime => return Some(datetime_pattern(width, precision)),
            Self::B8601Dn => "yyyyMMdd",
            Self::E8601Dn => "yyyy-MM-dd",
            Self::DtDate => match width {
                9 => "ddMMMyyyy",
                5 | 6 => "ddMMM",
                _ => "ddMMMyy",
            },
            Self::DtMonyy => {
                if width == 7 {
                    "MMMyyyy"
                } else {
                    "MMMyy"
                }
            }
            Self::DtYear => {
                if matches!(width, 2 | 3) {
                    "yy"
                } else {
                    "yyyy"
                }
            }
            _ => return None,
        };
        Some(pattern.to_owned())
    }
}

impl TemporalFormat for DateTimeFormat {
    fn default_width(self) -> u32 {
        match self {
            Self::DateTime => 16,
            Self::B8601Dn | Self::E8601Dn | Self::MdyAmPm => 10,
            Self::B8601Dt | Self::E8601Dt | Self::DateAmPm => 19,
            Self::B8601Dx
            | Self::B8601Dz
            | Self::B8601Lx
            | Self::E8601Dx
            | Self::E8601Dz
            | Self::E8601Lx => 26,
            Self::DtDate => 7,
            Self::DtMonyy => 5,
            Self::DtWkdatx => 29,
            Self::DtYear => 4,
            Self::Tod => 8,
        }
    }

    fn actual_precision(self, width: u32, precision: u32) -> u32 {
        match self {
            Self::DateTime | Self::Tod => {
                let default = self.default_width();
                if width > default {
                    (width - default).min(precision)
                } else {
                    0
                }
            }
            _ => {
                let default = self.default_width();
                if width > default + 1 {
                    (width - default - 1).min(precision)
                } else {
                    0
                }
            }
        }
    }

    fn internal(self, width: u32, precision: u32) -> Option<FormatFn> {
        if self == Self::Tod {
            return Some(Arc::new(move |seconds| time_of_day(seconds, width, precision)));
        }
        let pattern = self.pattern(width, precision)?;
        let uppercase = matches!(self, Self::DateTime | Self::DtDate | Self::DtMonyy);
        Some(pattern_fn(&pattern, precision, uppercase, width))
    }

    fn fallback(self) -> FormatFn {
        Self::fallback_format()
    }
}

fn pattern_fn(pattern: &str, precision: u32, uppercase: bool, width: u32) -> FormatFn {
    let pattern = Pattern::compile(pattern);
    Arc::new(move |seconds| match seconds_to_datetime(seconds, precision) {
        Some(moment) if uppercase => pattern.render(moment.date(), moment.time()).to_uppercase(),
        Some(moment) => pattern.render(moment.date(), moment.time()),
        None => overflow(width),
    })
}

/// `DATETIMEw.d` pattern: the integral part is chosen from the width left
/// after the fraction digits, as long as that still shows full seconds.
fn datetime_pattern(width: u32, precision: u32) -> String {
    let mut integral_width = width.saturating_sub(precision);
    if integral_width < 16 {
        integral_width = width;
    }
    let mut pattern = match integral_width {
        19.. => "ddMMMyyyy:HH:mm:ss",
        7 | 8 => "ddMMMyy",
        9 => "ddMMMyyyy",
        10..=12 => "ddMMMyy:HH",
        13..=15 => "ddMMMyy:HH:mm",
        _ => "ddMMMyy:HH:mm:ss",
    }
    .to_owned();

    if precision > 0
        && let Some(fraction_width) = width.checked_sub(17).map(|room| room.min(precision))
    {
        pattern.push('.');
        pattern.extend(std::iter::repeat_n('S', fraction_width as usize));
    }
    pattern
}

/// `TODw.d`: time of day of a datetime; negative values count back from
/// midnight.
fn time_of_day(seconds: f64, width: u32, precision: u32) -> String {
    let day_seconds = |precision: u32| {
        round_seconds(seconds, precision).map(|rounded| {
            let within_day = rounded.abs().rem(SECONDS_IN_DAY);
            if seconds < 0.0 && !within_day.is_zero() {
                Decimal::from_int(SECONDS_IN_DAY).sub(within_day)
            } else {
                within_day
            }
        })
    };
    clock(width, precision, day_seconds, true)
}
