use std::borrow::Cow;
use std::sync::Arc;

use super::pattern::Pattern;
use super::{FormatFn, TemporalFormat, days_to_date, overflow};

/// Date display formats; raw values are days since 1960-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateFormat {
    Date,
    Day,
    Ddmmyy,
    DdmmyyB,
    DdmmyyC,
    DdmmyyD,
    DdmmyyN,
    DdmmyyP,
    DdmmyyS,
    Mmddyy,
    MmddyyB,
    MmddyyC,
    MmddyyD,
    MmddyyN,
    MmddyyP,
    MmddyyS,
    Yymmdd,
    YymmddB,
    YymmddC,
    YymmddD,
    YymmddN,
    YymmddP,
    YymmddS,
    Mmyy,
    MmyyC,
    MmyyD,
    MmyyN,
    MmyyP,
    MmyyS,
    Yymm,
    YymmC,
    YymmD,
    YymmN,
    YymmP,
    YymmS,
    Julian,
    Julday,
    Month,
    Year,
    Monyy,
    Yymon,
    B8601Da,
    E8601Da,
    Monname,
    Weekdate,
    Weekdatx,
    Weekday,
    Downame,
    Worddate,
    Worddatx,
    Qtr,
}

/// Field order of the day/month/year families.
#[derive(Clone, Copy)]
enum Order {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

impl DateFormat {
    pub const ALL: [Self; 51] = [
        Self::Date,
        Self::Day,
        Self::Ddmmyy,
        Self::DdmmyyB,
        Self::DdmmyyC,
        Self::DdmmyyD,
        Self::DdmmyyN,
        Self::DdmmyyP,
        Self::DdmmyyS,
        Self::Mmddyy,
        Self::MmddyyB,
        Self::MmddyyC,
        Self::MmddyyD,
        Self::MmddyyN,
        Self::MmddyyP,
        Self::MmddyyS,
        Self::Yymmdd,
        Self::YymmddB,
        Self::YymmddC,
        Self::YymmddD,
        Self::YymmddN,
        Self::YymmddP,
        Self::YymmddS,
        Self::Mmyy,
        Self::MmyyC,
        Self::MmyyD,
        Self::MmyyN,
        Self::MmyyP,
        Self::MmyyS,
        Self::Yymm,
        Self::YymmC,
        Self::YymmD,
        Self::YymmN,
        Self::YymmP,
        Self::YymmS,
        Self::Julian,
        Self::Julday,
        Self::Month,
        Self::Year,
        Self::Monyy,
        Self::Yymon,
        Self::B8601Da,
        Self::E8601Da,
        Self::Monname,
        Self::Weekdate,
        Self::Weekdatx,
        Self::Weekday,
        Self::Downame,
        Self::Worddate,
        Self::Worddatx,
        Self::Qtr,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Day => "DAY",
            Self::Ddmmyy => "DDMMYY",
            Self::DdmmyyB => "DDMMYYB",
            Self::DdmmyyC => "DDMMYYC",
            Self::DdmmyyD => "DDMMYYD",
            Self::DdmmyyN => "DDMMYYN",
            Self::DdmmyyP => "DDMMYYP",
            Self::DdmmyyS => "DDMMYYS",
            Self::Mmddyy => "MMDDYY",
            Self::MmddyyB => "MMDDYYB",
            Self::MmddyyC => "MMDDYYC",
            Self::MmddyyD => "MMDDYYD",
            Self::MmddyyN => "MMDDYYN",
            Self::MmddyyP => "MMDDYYP",
            Self::MmddyyS => "MMDDYYS",
            Self::Yymmdd => "YYMMDD",
            Self::YymmddB => "YYMMDDB",
            Self::YymmddC => "YYMMDDC",
            Self::YymmddD => "YYMMDDD",
            Self::YymmddN => "YYMMDDN",
            Self::YymmddP => "YYMMDDP",
            Self::YymmddS => "YYMMDDS",
            Self::Mmyy => "MMYY",
            Self::MmyyC => "MMYYC",
            Self::MmyyD => "MMYYD",
            Self::MmyyN => "MMYYN",
            Self::MmyyP => "MMYYP",
            Self::MmyyS => "MMYYS",
            Self::Yymm => "YYMM",
            Self::YymmC => "YYMMC",
            Self::YymmD => "YYMMD",
            Self::YymmN => "YYMMN",
            Self::YymmP => "YYMMP",
            Self::YymmS => "YYMMS",
            Self::Julian => "JULIAN",
            Self::Julday => "JULDAY",
            Self::Month => "MONTH",
            Self::Year => "YEAR",
            Self::Monyy => "MONYY",
            Self::Yymon => "YYMON",
            Self::B8601Da => "B8601DA",
            Self::E8601Da => "E8601DA",
            Self::Monname => "MONNAME",
            Self::Weekdate => "WEEKDATE",
            Self::Weekdatx => "WEEKDATX",
            Self::Weekday => "WEEKDAY",
            Self::Downame => "DOWNAME",
            Self::Worddate => "WORDDATE",
            Self::Worddatx => "WORDDATX",
            Self::Qtr => "QTR",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.name() == name)
    }

    /// Pattern for the `DATE` fallback rendering used by unimplemented variants.
    pub(super) fn fallback_format() -> FormatFn {
        pattern_fn(&date_pattern(7), true, 7)
    }

    fn pattern(self, width: u32) -> Option<Cow<'static, str>> {
        let pattern = match self {
            Self::Date => date_pattern(width),
            Self::Day => "d".into(),
            Self::Ddmmyy | Self::DdmmyyS => ordered(width, "/", Order::DayMonthYear),
            Self::DdmmyyB => ordered(width, " ", Order::DayMonthYear),
            Self::DdmmyyC => ordered(width, ":", Order::DayMonthYear),
            Self::DdmmyyD => ordered(width, "-", Order::DayMonthYear),
            Self::DdmmyyN => ordered(width, "", Order::DayMonthYear),
            Self::DdmmyyP => ordered(width, ".", Order::DayMonthYear),
            Self::Mmddyy | Self::MmddyyS => ordered(width, "/", Order::MonthDayYear),
            Self::MmddyyB => ordered(width, " ", Order::MonthDayYear),
            Self::MmddyyC => ordered(width, ":", Order::MonthDayYear),
            Self::MmddyyD => ordered(width, "-", Order::MonthDayYear),
            Self::MmddyyN => ordered(width, "", Order::MonthDayYear),
            Self::MmddyyP => ordered(width, ".", Order::MonthDayYear),
            Self::Yymmdd | Self::YymmddD => ordered(width, "-", Order::YearMonthDay),
            Self::YymmddB => ordered(width, " ", Order::YearMonthDay),
            Self::YymmddC => ordered(width, ":", Order::YearMonthDay),
            Self::YymmddN => ordered(width, "", Order::YearMonthDay),
            Self::YymmddP => ordered(width, ".", Order::YearMonthDay),
            Self::YymmddS => ordered(width, "/", Order::YearMonthDay),
            Self::Mmyy => month_year(width, "'M'"),
            Self::MmyyC => month_year(width, ":"),
            Self::MmyyD => month_year(width, "-"),
            Self::MmyyP => month_year(width, "."),
            Self::MmyyS => month_year(width, "/"),
            Self::MmyyN => if matches!(width, 4 | 5) { "MMyy" } else { "MMyyyy" }.into(),
            Self::Yymm => year_month(width, "'M'"),
            Self::YymmC => year_month(width, ":"),
            Self::YymmD => year_month(width, "-"),
            Self::YymmP => year_month(width, "."),
            Self::YymmS => year_month(width, "/"),
            Self::YymmN => if matches!(width, 4 | 5) { "yyMM" } else { "yyyyMM" }.into(),
            Self::Julian => if width == 7 { "yyyyDDD" } else { "yyDDD" }.into(),
            Self::Julday => "D".into(),
            Self::Month => "M".into(),
            Self::Year => if matches!(width, 2 | 3) { "yy" } else { "yyyy" }.into(),
            Self::Monyy => if width == 7 { "MMMyyyy" } else { "MMMyy" }.into(),
            Self::Yymon => if matches!(width, 5 | 6) { "yyMMM" } else { "yyyyMMM" }.into(),
            Self::B8601Da => "yyyyMMdd".into(),
            Self::E8601Da => "yyyy-MM-dd".into(),
            Self::Monname => "MMMM".into(),
            Self::Weekdate => match width {
                3..=8 => "EEE",
                9..=14 => "EEEE",
                15 | 16 => "EEE, MMM d, yy",
                17..=22 => "EEE, MMM d, yyyy",
                23..=28 => "EEEE, MMM d, yyyy",
                _ => "EEEE, MMMM d, yyyy",
            }
            .into(),
            Self::Weekdatx => match width {
                3..=8 => "EEE",
                9..=14 => "EEEE",
                15 | 16 => "EEE, d MMM yy",
                17..=22 => "EEE, d MMM yyyy",
                23..=28 => "EEEE, d MMM yyyy",
                _ => "EEEE, d MMMM yyyy",
            }
            .into(),
            Self::Weekday => "e".into(),
            Self::Downame => "EEEE".into(),
            Self::Worddate => match width {
                3..=8 => "MMM",
                9..=11 => "MMMM",
                12..=17 => "MMM d, yyyy",
                _ => "MMMM d, yyyy",
            }
            .into(),
            Self::Worddatx => match width {
                3..=8 => "MMM",
                9..=11 => "MMMM",
                12..=17 => "d MMM yyyy",
                _ => "d MMMM yyyy",
            }
            .into(),
            Self::Qtr => return None,
        };
        Some(pattern)
    }
}

impl TemporalFormat for DateFormat {
    fn default_width(self) -> u32 {
        match self {
            Self::Date | Self::Mmyy | Self::MmyyC | Self::MmyyD | Self::MmyyP | Self::MmyyS => 7,
            Self::Yymm | Self::YymmC | Self::YymmD | Self::YymmP | Self::YymmS | Self::Yymon => 7,
            Self::Day | Self::Month => 2,
            Self::MmyyN | Self::YymmN => 6,
            Self::Julian | Self::Monyy => 5,
            Self::Julday => 3,
            Self::Year => 4,
            Self::B8601Da | Self::E8601Da => 10,
            Self::Monname | Self::Downame => 9,
            Self::Weekdate | Self::Weekdatx => 29,
            Self::Weekday => 1,
            Self::Worddate | Self::Worddatx => 18,
            Self::Qtr => 0,
            _ => 8,
        }
    }

    fn internal(self, width: u32, _precision: u32) -> Option<FormatFn> {
        // MONTH1. is a single hexadecimal digit.
        if self == Self::Month && width == 1 {
            return Some(Arc::new(|days| {
                days_to_date(days).map_or_else(
                    || overflow(1),
                    |date| format!("{:X}", u8::from(date.month())),
                )
            }));
        }
        let pattern = self.pattern(width)?;
        let uppercase = matches!(self, Self::Date | Self::Month | Self::Monyy | Self::Yymon);
        let render = pattern_fn(&pattern, uppercase, width);
        if matches!(self, Self::Monname | Self::Downame) {
            let limit = width as usize;
            return Some(Arc::new(move |days| {
                let mut text = render(days);
                text.truncate(limit);
                text
            }));
        }
        Some(render)
    }

    fn fallback(self) -> FormatFn {
        Self::fallback_format()
    }
}

fn pattern_fn(pattern: &str, uppercase: bool, width: u32) -> FormatFn {
    let pattern = Pattern::compile(pattern);
    Arc::new(move |days| match days_to_date(days) {
        Some(date) if uppercase => pattern.render_date(date).to_uppercase(),
        Some(date) => pattern.render_date(date),
        None => overflow(width),
    })
}

fn date_pattern(width: u32) -> Cow<'static, str> {
    match width {
        5 | 6 => "ddMMM",
        9 | 10 => "ddMMMyyyy",
        11 => "dd-MMM-yyyy",
        _ => "ddMMMyy",
    }
    .into()
}

fn ordered(width: u32, separator: &str, order: Order) -> Cow<'static, str> {
    let (first, second, third) = match order {
        Order::DayMonthYear => ("dd", "MM", "yy"),
        Order::MonthDayYear => ("MM", "dd", "yy"),
        Order::YearMonthDay => ("yy", "MM", "dd"),
    };
    let full_year = |part: &'static str| if part == "yy" { "yyyy" } else { part };
    let pattern = match width {
        2 | 3 => first.to_owned(),
        4 => format!("{first}{second}"),
        5 => format!("{first}{separator}{second}"),
        6 | 7 => format!("{first}{second}{third}"),
        10 => format!(
            "{}{separator}{second}{separator}{}",
            full_year(first),
            full_year(third)
        ),
        _ if separator.is_empty() => {
            format!("{}{second}{}", full_year(first), full_year(third))
        }
        _ => format!("{first}{separator}{second}{separator}{third}"),
    };
    Cow::Owned(pattern)
}

fn month_year(width: u32, separator: &str) -> Cow<'static, str> {
    let year = if matches!(width, 5 | 6) { "yy" } else { "yyyy" };
    Cow::Owned(format!("MM{separator}{year}"))
}

fn year_month(width: u32, separator: &str) -> Cow<'static, str> {
    let year = if matches!(width, 5 | 6) { "yy" } else { "yyyy" };
    Cow::Owned(format!("{year}{separator}MM"))
}
