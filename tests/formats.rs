#![allow(clippy::pedantic)]
mod common;

use std::io::Cursor;

use common::{Cell, ColumnSpec, Dataset, Layout, PAGE_DATA, PAGE_META, Page};
use sas7bdat_reader::{OutputDateType, PercentPattern, ReadOptions, SasReader, Value};
use time::macros::{date, datetime};

/// One row holding `values` under the given formats, one column per format.
fn single_row(formats: &[(&str, u16, u16)], values: &[f64]) -> Vec<u8> {
    let columns = formats
        .iter()
        .enumerate()
        .map(|(i, (format, width, precision))| {
            ColumnSpec::numeric(&format!("c{i}"), i * 8).with_format(format, *width, *precision)
        })
        .collect();
    let dataset = Dataset::new(Layout::X64, columns);
    let cells: Vec<Cell<'_>> = values.iter().map(|v| Cell::Num(*v)).collect();
    dataset.build(&[
        Page::new(PAGE_META).with_subheaders(dataset.metadata(dataset.counts(1))),
        Page::new(PAGE_DATA).with_rows(vec![dataset.row(&cells)]),
    ])
}

fn read_row(bytes: Vec<u8>, options: ReadOptions) -> Vec<Value> {
    let mut reader = SasReader::from_reader(Cursor::new(bytes), options).unwrap();
    reader.read_next().unwrap().unwrap()
}

fn formatted(output: OutputDateType) -> ReadOptions {
    ReadOptions::new().with_output_date_type(output)
}

fn strings(row: Vec<Value>) -> Vec<String> {
    row.into_iter()
        .map(|value| match value {
            Value::Str(text) => text,
            other => panic!("expected text, got {other:?}"),
        })
        .collect()
}

#[test]
fn legacy_output_is_a_utc_instant() {
    let bytes = single_row(&[("DATE", 9, 0), ("DATETIME", 19, 0), ("TIME", 8, 0)], &[
        0.0, 86_400.5, 3_725.0,
    ]);
    let row = read_row(bytes, ReadOptions::default());
    assert_eq!(row, vec![
        Value::Timestamp(datetime!(1960-01-01 0:00 UTC)),
        Value::Timestamp(datetime!(1960-01-02 0:00:00.5 UTC)),
        Value::Int64(3_725),
    ]);
}

#[test]
fn temporal_output_uses_calendar_types() {
    let bytes = single_row(&[("MMDDYY", 10, 0), ("DATETIME", 19, 0)], &[19_434.0, 60.0]);
    let row = read_row(bytes, formatted(OutputDateType::Temporal));
    assert_eq!(row, vec![
        Value::Date(date!(2013 - 03 - 17)),
        Value::DateTime(datetime!(1960-01-01 0:01)),
    ]);
}

#[test]
fn year_with_default_width_renders_four_digits() {
    let bytes = single_row(&[("YEAR", 0, 0)], &[0.0]);
    let row = read_row(bytes, formatted(OutputDateType::SasFormat));
    assert_eq!(strings(row), ["1960"]);
}

#[test]
fn display_strings_for_common_formats() {
    let bytes = single_row(
        &[("DATE", 9, 0), ("YYMMDD", 10, 0), ("DATETIME", 0, 0), ("TIME", 8, 0)],
        &[19_434.0, 19_434.0, 0.0, 3_725.0],
    );
    let row = read_row(bytes, formatted(OutputDateType::SasFormatTrim));
    assert_eq!(strings(row), ["17MAR2013", "2013-03-17", "01JAN60:00:00:00", "1:02:05"]);
}

#[test]
fn dates_past_the_year_4000_threshold() {
    let bytes = single_row(&[("DATE", 9, 0), ("DATE", 9, 0)], &[745_153.0, 745_154.0]);
    let row = read_row(bytes, formatted(OutputDateType::SasFormat));
    assert_eq!(strings(row), ["28FEB4000", "01MAR4000"]);
}

#[test]
fn missing_temporal_values() {
    let bytes = single_row(&[("DATE", 9, 0)], &[f64::NAN]);
    assert_eq!(read_row(bytes.clone(), ReadOptions::default()), vec![Value::Missing]);
    assert_eq!(
        strings(read_row(bytes.clone(), formatted(OutputDateType::SasFormat))),
        ["."]
    );
    assert_eq!(
        read_row(bytes, formatted(OutputDateType::SasValue)),
        vec![Value::Missing]
    );
}

#[test]
fn raw_values_pass_through() {
    let bytes = single_row(&[("DATE", 9, 0), ("TIME", 8, 0)], &[2.5, 90.25]);
    let row = read_row(bytes, formatted(OutputDateType::SasValue));
    assert_eq!(row, vec![Value::Float(2.5), Value::Float(90.25)]);
}

#[test]
fn percent_columns() {
    let bytes = single_row(&[("PERCENT", 8, 1)], &[0.125]);
    assert_eq!(strings(read_row(bytes.clone(), ReadOptions::default())), ["12.5%"]);

    let options = ReadOptions::new().with_percent_pattern(PercentPattern::Fixed(3));
    assert_eq!(strings(read_row(bytes.clone(), options)), ["12.500%"]);

    let options = ReadOptions::new().with_percent_pattern(PercentPattern::Raw);
    assert_eq!(read_row(bytes, options), vec![Value::Float(0.125)]);
}
