use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use simdutf8::basic;

use crate::metadata::{Column, ColumnKind, Endianness};
use crate::parser::byteorder::{read_f64_padded, read_i16};
use crate::parser::encoding::trim_trailing;
use crate::temporal::{OutputDateType, TemporalFormatter};
use crate::value::Value;

const PERCENT_FORMAT: &str = "PERCENT";

/// Positive numbers below this are stored missing values, not data.
const MISSING_EPSILON: f64 = 1e-300;

/// Decimal pattern applied to `PERCENT` columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PercentPattern {
    /// Fraction digits taken from the column format precision.
    #[default]
    FromFormat,
    /// Always this many fraction digits.
    Fixed(u32),
    /// Leave the value as a plain number.
    Raw,
}

impl PercentPattern {
    fn render(self, value: f64, format_precision: u32) -> Value {
        let digits = match self {
            Self::FromFormat => format_precision,
            Self::Fixed(digits) => digits,
            Self::Raw => return Value::Float(value),
        };
        Value::Str(format!("{:.*}%", digits as usize, value * 100.0))
    }
}

/// Caller choices that shape how cells are materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellOptions {
    pub output_date_type: OutputDateType,
    pub byte_output: bool,
    pub percent_pattern: PercentPattern,
}

/// Converts raw cell slices into [`Value`]s, owning the per-file temporal
/// format cache.
#[derive(Debug)]
pub struct CellDecoder {
    encoding: &'static Encoding,
    endianness: Endianness,
    options: CellOptions,
    temporal: TemporalFormatter,
}

impl CellDecoder {
    #[must_use]
    pub fn new(encoding: &'static Encoding, endianness: Endianness, options: CellOptions) -> Self {
        Self {
            encoding,
            endianness,
            options,
            temporal: TemporalFormatter::new(),
        }
    }

    #[must_use]
    pub const fn options(&self) -> CellOptions {
        self.options
    }

    pub fn decode(&mut self, column: &Column, cell: &[u8]) -> Value {
        match column.kind {
            ColumnKind::Numeric => self.decode_numeric(column, cell),
            ColumnKind::Text => self.decode_text(cell),
        }
    }

    fn decode_numeric(&mut self, column: &Column, cell: &[u8]) -> Value {
        match *cell {
            [] => return Value::Missing,
            [byte] => return Value::Int16(i16::from(byte)),
            [_, _] => return Value::Int16(read_i16(self.endianness, cell)),
            _ => {}
        }

        let value = read_f64_padded(self.endianness, cell);
        let format = &column.format;
        let name = format.name.as_str();
        let output = self.options.output_date_type;

        if name.is_empty() {
            number(value)
        } else if name == PERCENT_FORMAT {
            if is_missing_number(value) {
                Value::Missing
            } else {
                self.options.percent_pattern.render(value, format.precision)
            }
        } else if TemporalFormatter::is_datetime_format(name) {
            self.temporal
                .format_sas_datetime(value, output, name, format.width, format.precision)
        } else if TemporalFormatter::is_date_format(name) {
            self.temporal
                .format_sas_date(value, output, name, format.width, format.precision)
        } else if TemporalFormatter::is_time_format(name) {
            self.temporal
                .format_sas_time(value, output, name, format.width, format.precision)
        } else {
            number(value)
        }
    }

    fn decode_text(&self, cell: &[u8]) -> Value {
        let trimmed = trim_trailing(cell);
        if trimmed.is_empty() {
            return Value::Missing;
        }
        if self.options.byte_output {
            return Value::Bytes(trimmed.to_vec());
        }
        Value::Str(decode_string(trimmed, self.encoding).into_owned())
    }
}

fn is_missing_number(value: f64) -> bool {
    value.is_nan() || (value > 0.0 && value < MISSING_EPSILON)
}

fn number(value: f64) -> Value {
    if is_missing_number(value) {
        Value::Missing
    } else {
        Value::Float(value)
    }
}

/// Decodes already trimmed text bytes with the file encoding.
///
/// ASCII-only cells of ASCII-compatible encodings and all UTF-8 cells go
/// through the SIMD validator and are borrowed when valid.
pub fn decode_string<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    if encoding == UTF_8 || (encoding.is_ascii_compatible() && bytes.is_ascii()) {
        if let Ok(text) = basic::from_utf8(bytes) {
            return Cow::Borrowed(text);
        }
        if encoding == UTF_8 {
            return String::from_utf8_lossy(bytes);
        }
    }

    let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors && decoded.is_empty() {
        return String::from_utf8_lossy(bytes);
    }
    decoded
}

#[cfg(test)]
mod tests {
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use time::macros::date;

    use super::*;
    use crate::metadata::ColumnFormat;

    fn numeric(length: u32, format: ColumnFormat) -> Column {
        Column {
            id: 1,
            name: "x".to_owned(),
            label: String::new(),
            format,
            kind: ColumnKind::Numeric,
            length,
        }
    }

    fn text(length: u32) -> Column {
        Column {
            id: 1,
            name: "s".to_owned(),
            label: String::new(),
            format: ColumnFormat::default(),
            kind: ColumnKind::Text,
            length,
        }
    }

    fn decoder(options: CellOptions) -> CellDecoder {
        CellDecoder::new(WINDOWS_1252, Endianness::Little, options)
    }

    #[test]
    fn short_cells_are_integers() {
        let mut cells = decoder(CellOptions::default());
        let column = numeric(2, ColumnFormat::default());
        assert_eq!(cells.decode(&column, &(-7i16).to_le_bytes()), Value::Int16(-7));
        assert_eq!(cells.decode(&numeric(1, ColumnFormat::default()), &[9]), Value::Int16(9));
    }

    #[test]
    fn truncated_doubles_are_zero_padded() {
        let mut cells = decoder(CellOptions::default());
        let bytes = 1.5f64.to_le_bytes();
        // The stored bytes of a 3-byte numeric are the three most significant ones.
        let column = numeric(3, ColumnFormat::default());
        assert_eq!(cells.decode(&column, &bytes[5..]), Value::Float(1.5));
    }

    #[test]
    fn nan_and_tiny_positive_numbers_are_missing() {
        let mut cells = decoder(CellOptions::default());
        let column = numeric(8, ColumnFormat::default());
        assert_eq!(cells.decode(&column, &f64::NAN.to_le_bytes()), Value::Missing);
        assert_eq!(cells.decode(&column, &1e-301f64.to_le_bytes()), Value::Missing);
        assert_eq!(cells.decode(&column, &(-1e-301f64).to_le_bytes()), Value::Float(-1e-301));
        assert_eq!(cells.decode(&column, &0.0f64.to_le_bytes()), Value::Float(0.0));
    }

    #[test]
    fn unknown_formats_stay_numeric() {
        let mut cells = decoder(CellOptions::default());
        let column = numeric(8, ColumnFormat::new("BEST", 12, 0));
        assert_eq!(cells.decode(&column, &42.25f64.to_le_bytes()), Value::Float(42.25));
    }

    #[test]
    fn percent_patterns() {
        let column = numeric(8, ColumnFormat::new(PERCENT_FORMAT, 8, 2));
        let raw = 0.1234f64.to_le_bytes();

        let mut cells = decoder(CellOptions::default());
        assert_eq!(cells.decode(&column, &raw), Value::Str("12.34%".to_owned()));

        let mut cells = decoder(CellOptions {
            percent_pattern: PercentPattern::Fixed(0),
            ..CellOptions::default()
        });
        assert_eq!(cells.decode(&column, &raw), Value::Str("12%".to_owned()));

        let mut cells = decoder(CellOptions {
            percent_pattern: PercentPattern::Raw,
            ..CellOptions::default()
        });
        assert_eq!(cells.decode(&column, &raw), Value::Float(0.1234));
        assert_eq!(cells.decode(&column, &f64::NAN.to_le_bytes()), Value::Missing);
    }

    #[test]
    fn temporal_formats_are_routed_by_family() {
        let mut cells = decoder(CellOptions {
            output_date_type: OutputDateType::Temporal,
            ..CellOptions::default()
        });
        let date = numeric(8, ColumnFormat::new("DATE", 9, 0));
        assert_eq!(
            cells.decode(&date, &19_434.0f64.to_le_bytes()),
            Value::Date(date!(2013 - 03 - 17))
        );

        let mut cells = decoder(CellOptions {
            output_date_type: OutputDateType::SasFormatTrim,
            ..CellOptions::default()
        });
        let datetime = numeric(8, ColumnFormat::new("DATETIME", 0, 0));
        assert_eq!(
            cells.decode(&datetime, &0.0f64.to_le_bytes()),
            Value::Str("01JAN60:00:00:00".to_owned())
        );
        let time = numeric(8, ColumnFormat::new("TIME", 8, 0));
        assert_eq!(
            cells.decode(&time, &3_725.0f64.to_le_bytes()),
            Value::Str("1:02:05".to_owned())
        );
    }

    #[test]
    fn text_is_trimmed_and_decoded() {
        let mut cells = decoder(CellOptions::default());
        let column = text(8);
        assert_eq!(
            cells.decode(&column, b"caf\xE9 \0\t "),
            Value::Str("caf\u{e9}".to_owned())
        );
        assert_eq!(cells.decode(&column, b"   \0\0"), Value::Missing);
    }

    #[test]
    fn byte_output_keeps_trimmed_bytes() {
        let mut cells = decoder(CellOptions {
            byte_output: true,
            ..CellOptions::default()
        });
        assert_eq!(
            cells.decode(&text(6), b"ab\xE9  "),
            Value::Bytes(b"ab\xE9".to_vec())
        );
    }

    #[test]
    fn utf8_files_borrow_valid_text() {
        assert!(matches!(decode_string("h\u{e9}".as_bytes(), UTF_8), Cow::Borrowed("h\u{e9}")));
        assert_eq!(decode_string(b"ok\xFF", UTF_8), "ok\u{FFFD}");
        assert!(matches!(decode_string(b"plain", WINDOWS_1252), Cow::Borrowed("plain")));
    }
}
