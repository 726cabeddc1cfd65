use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// File-level properties recovered from the header and metadata subheaders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileProperties {
    pub u64: bool,
    pub endianness: Endianness,
    pub compression: Compression,
    pub encoding: Option<String>,
    pub name: String,
    pub file_type: String,
    pub file_label: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_created: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_modified: Option<OffsetDateTime>,
    pub sas_release: String,
    pub server_type: String,
    pub os_type: String,
    pub os_name: String,
    pub header_length: u32,
    pub page_length: u32,
    pub page_count: u64,
    pub row_length: u64,
    pub row_count: u64,
    pub deleted_row_count: u64,
    pub mix_page_row_count: u64,
    pub column_count: u64,
}

impl FileProperties {
    #[must_use]
    pub const fn new(endianness: Endianness, u64: bool) -> Self {
        Self {
            u64,
            endianness,
            compression: Compression::None,
            encoding: None,
            name: String::new(),
            file_type: String::new(),
            file_label: String::new(),
            date_created: None,
            date_modified: None,
            sas_release: String::new(),
            server_type: String::new(),
            os_type: String::new(),
            os_name: String::new(),
            header_length: 0,
            page_length: 0,
            page_count: 0,
            row_length: 0,
            row_count: 0,
            deleted_row_count: 0,
            mix_page_row_count: 0,
            column_count: 0,
        }
    }

    /// Name of the compression literal, `None` when rows are stored verbatim.
    #[must_use]
    pub const fn compression_method(&self) -> Option<&'static str> {
        self.compression.literal()
    }

    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        !matches!(self.compression, Compression::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endianness {
    Little,
    Big,
}

/// Row compression announced by the literal stored in the first text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compression {
    None,
    /// `SASYZCRL` run-length encoding.
    Row,
    /// `SASYZCR2` Ross data compression.
    Binary,
}

pub const COMPRESSION_LITERAL_ROW: &str = "SASYZCRL";
pub const COMPRESSION_LITERAL_BINARY: &str = "SASYZCR2";

impl Compression {
    /// Matches a compression literal exactly; anything else means no compression.
    #[must_use]
    pub fn from_literal(literal: &str) -> Option<Self> {
        match literal {
            COMPRESSION_LITERAL_ROW => Some(Self::Row),
            COMPRESSION_LITERAL_BINARY => Some(Self::Binary),
            _ => None,
        }
    }

    #[must_use]
    pub const fn literal(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Row => Some(COMPRESSION_LITERAL_ROW),
            Self::Binary => Some(COMPRESSION_LITERAL_BINARY),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    #[must_use]
    pub const fn from_type_code(code: u8) -> Self {
        if code == 1 { Self::Numeric } else { Self::Text }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric)
    }
}

/// Display format attached to a column (`DATE9.`, `PERCENT8.2`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnFormat {
    pub name: String,
    pub width: u32,
    pub precision: u32,
}

impl ColumnFormat {
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, precision: u32) -> Self {
        Self {
            name: name.into(),
            width,
            precision,
        }
    }

    /// Format known only by name, as back-filled from an AMD page.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, 0, 0)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_empty() && self.width == 0 && self.precision == 0
    }
}

impl fmt::Display for ColumnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        f.write_str(&self.name)?;
        if self.width != 0 {
            write!(f, "{}", self.width)?;
        }
        f.write_str(".")?;
        if self.precision != 0 {
            write!(f, "{}", self.precision)?;
        }
        Ok(())
    }
}

/// Column descriptor in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// 1-based ordinal.
    pub id: u32,
    pub name: String,
    pub label: String,
    pub format: ColumnFormat,
    pub kind: ColumnKind,
    pub length: u32,
}
