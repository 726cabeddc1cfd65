use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result, Warning};
use crate::logger::{log_error, set_log_prefix};
use crate::metadata::{Column, FileProperties};
use crate::parser::{CellOptions, PercentPattern, RowSession, parse_header};
use crate::temporal::OutputDateType;
use crate::value::Value;

/// Decoding choices applied while a file is opened and read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    encoding: Option<String>,
    cells: CellOptions,
}

impl ReadOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            encoding: None,
            cells: CellOptions {
                output_date_type: OutputDateType::LegacyDate,
                byte_output: false,
                percent_pattern: PercentPattern::FromFormat,
            },
        }
    }

    /// Decodes text with `label` instead of the encoding declared in the file.
    #[must_use]
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    #[must_use]
    pub const fn with_output_date_type(mut self, output: OutputDateType) -> Self {
        self.cells.output_date_type = output;
        self
    }

    /// Returns text cells as raw trimmed bytes.
    #[must_use]
    pub const fn with_byte_output(mut self, enabled: bool) -> Self {
        self.cells.byte_output = enabled;
        self
    }

    #[must_use]
    pub const fn with_percent_pattern(mut self, pattern: PercentPattern) -> Self {
        self.cells.percent_pattern = pattern;
        self
    }

    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    #[must_use]
    pub const fn output_date_type(&self) -> OutputDateType {
        self.cells.output_date_type
    }

    #[must_use]
    pub const fn byte_output(&self) -> bool {
        self.cells.byte_output
    }

    #[must_use]
    pub const fn percent_pattern(&self) -> PercentPattern {
        self.cells.percent_pattern
    }
}

/// Forward-only reader over one SAS7BDAT stream.
///
/// Opening parses the header and every metadata page up to the first rows;
/// rows are then decoded on demand, one page buffered at a time.
#[derive(Debug)]
pub struct SasReader<R: Read> {
    session: RowSession<R>,
}

impl SasReader<BufReader<File>> {
    /// Opens a SAS7BDAT file from disk with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header and
    /// metadata cannot be parsed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ReadOptions::default())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header and
    /// metadata cannot be parsed.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let _prefix = set_log_prefix(path.display().to_string());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }
}

impl<R: Read> SasReader<R> {
    /// Builds a reader from a stream positioned at the start of the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] or [`Error::TruncatedFile`] for a bad
    /// header, [`Error::UnsupportedEncoding`] when no character set resolves,
    /// or any error raised while reading metadata subheaders.
    pub fn from_reader(mut reader: R, options: ReadOptions) -> Result<Self> {
        let header = parse_header(&mut reader, options.encoding())?;
        let session = RowSession::new(reader, header, options.cells)?;
        Ok(Self { session })
    }

    #[must_use]
    pub const fn properties(&self) -> &FileProperties {
        self.session.properties()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.session.columns()
    }

    /// Columns in the order of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumnName`] for the first name the file does
    /// not contain.
    pub fn columns_by_name<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Column>> {
        let columns = self.columns();
        self.column_indices(names)
            .map(|indices| indices.into_iter().map(|index| &columns[index]).collect())
    }

    fn column_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let columns = self.columns();
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                columns
                    .iter()
                    .position(|column| column.name == name)
                    .ok_or_else(|| Error::UnknownColumnName {
                        name: name.to_owned(),
                    })
            })
            .collect()
    }

    /// Index of the next row to be read, i.e. the number of rows read so far.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.session.offset()
    }

    /// Non-fatal conditions met so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.session.warnings()
    }

    /// Decodes the next row, `None` once every row has been read.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be located or decompressed.
    pub fn read_next(&mut self) -> Result<Option<Vec<Value>>> {
        self.session.read_next(None).inspect_err(report)
    }

    /// Decodes the named columns of the next row, in the order of `names`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumnName`] for a name the file does not
    /// contain, or a decoding error as for [`SasReader::read_next`].
    pub fn read_next_projected<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Result<Option<Vec<Value>>> {
        let indices = self.column_indices(names)?;
        self.session.read_next(Some(&indices)).inspect_err(report)
    }

    /// Decodes every remaining row.
    ///
    /// # Errors
    ///
    /// Stops at the first row that fails to decode.
    pub fn read_all(&mut self) -> Result<Vec<Vec<Value>>> {
        self.rows().collect()
    }

    /// Decodes the named columns of every remaining row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownColumnName`] before reading anything if a name
    /// is missing, otherwise stops at the first row that fails to decode.
    pub fn read_all_projected<S: AsRef<str>>(&mut self, names: &[S]) -> Result<Vec<Vec<Value>>> {
        let indices = self.column_indices(names)?;
        let mut rows = Vec::new();
        while let Some(row) = self.session.read_next(Some(&indices)).inspect_err(report)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Lazy row sequence over the remaining rows.
    ///
    /// The iterator borrows the reader and advances its single cursor, so it
    /// is single-pass: rows it yields are not produced again.
    pub const fn rows(&mut self) -> Rows<'_, R> {
        Rows {
            reader: self,
            finished: false,
        }
    }
}

fn report(err: &Error) {
    log_error(&format!("row decoding failed: {err}"));
}

/// Borrowing iterator returned by [`SasReader::rows`].
#[derive(Debug)]
pub struct Rows<'a, R: Read> {
    reader: &'a mut SasReader<R>,
    finished: bool,
}

impl<R: Read> Iterator for Rows<'_, R> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.reader.read_next() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
