use time::{Date, Time};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Day(usize),
    DayOfYear(usize),
    Month(usize),
    Year(usize),
    Weekday(usize),
    WeekdayNumber,
    Hour(usize),
    Minute(usize),
    Second(usize),
    Fraction(usize),
}

/// Compiled date/time pattern in the legacy letter syntax (`ddMMMyyyy`,
/// `HH:mm:ss.SSS`, `'M'` for quoted literals).
///
/// Letter repetition selects the field width: one or two `M` render the
/// month number, three the short English name, four the full name. Letters
/// without a meaning here are copied as literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                // '' is an escaped quote, otherwise read up to the closing quote.
                if chars.get(i + 1) == Some(&'\'') {
                    literal.push('\'');
                    i += 2;
                    continue;
                }
                i += 1;
                while i < chars.len() {
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            literal.push('\'');
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    literal.push(chars[i]);
                    i += 1;
                }
                i += 1;
                continue;
            }

            let run = chars[i..].iter().take_while(|&&next| next == c).count();
            let token = match c {
                'd' => Token::Day(run),
                'D' => Token::DayOfYear(run),
                'M' => Token::Month(run),
                'y' => Token::Year(run),
                'E' => Token::Weekday(run),
                'e' => Token::WeekdayNumber,
                'H' => Token::Hour(run),
                'm' => Token::Minute(run),
                's' => Token::Second(run),
                'S' => Token::Fraction(run),
                _ => {
                    literal.extend(std::iter::repeat_n(c, run));
                    i += run;
                    continue;
                }
            };
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(token);
            i += run;
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        Self { tokens }
    }

    #[must_use]
    pub fn render_date(&self, date: Date) -> String {
        self.render(date, Time::MIDNIGHT)
    }

    #[must_use]
    pub fn render(&self, date: Date, time: Time) -> String {
        let mut out = String::with_capacity(self.tokens.len() * 3);
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Day(width) => push_padded(&mut out, i64::from(date.day()), *width),
                Token::DayOfYear(width) => push_padded(&mut out, i64::from(date.ordinal()), *width),
                Token::Month(width) => {
                    let name = MONTH_NAMES[usize::from(u8::from(date.month())) - 1];
                    match width {
                        1 | 2 => push_padded(&mut out, i64::from(u8::from(date.month())), *width),
                        3 => out.push_str(&name[..3]),
                        _ => out.push_str(name),
                    }
                }
                Token::Year(2) => {
                    push_padded(&mut out, i64::from(date.year()).rem_euclid(100), 2);
                }
                Token::Year(width) => push_padded(&mut out, i64::from(date.year()), *width),
                Token::Weekday(width) => {
                    let name =
                        WEEKDAY_NAMES[usize::from(date.weekday().number_days_from_monday())];
                    out.push_str(if *width >= 4 { name } else { &name[..3] });
                }
                Token::WeekdayNumber => {
                    push_padded(&mut out, i64::from(date.weekday().number_from_sunday()), 1);
                }
                Token::Hour(width) => push_padded(&mut out, i64::from(time.hour()), *width),
                Token::Minute(width) => push_padded(&mut out, i64::from(time.minute()), *width),
                Token::Second(width) => push_padded(&mut out, i64::from(time.second()), *width),
                Token::Fraction(width) => push_fraction(&mut out, time.nanosecond(), *width),
            }
        }
        out
    }
}

fn push_padded(out: &mut String, value: i64, width: usize) {
    let mut buffer = itoa::Buffer::new();
    let digits = buffer.format(value.unsigned_abs());
    if value < 0 {
        out.push('-');
    }
    out.extend(std::iter::repeat_n('0', width.saturating_sub(digits.len())));
    out.push_str(digits);
}

/// Leading `width` digits of the nanosecond field, truncated.
fn push_fraction(out: &mut String, nanos: u32, width: usize) {
    let mut buffer = itoa::Buffer::new();
    let digits = buffer.format(nanos);
    let mut fraction = String::with_capacity(9.max(width));
    fraction.extend(std::iter::repeat_n('0', 9 - digits.len()));
    fraction.push_str(digits);
    if width <= fraction.len() {
        fraction.truncate(width);
    } else {
        fraction.extend(std::iter::repeat_n('0', width - fraction.len()));
    }
    out.push_str(&fraction);
}
