use std::borrow::Cow;
use std::fmt;
use std::io;

/// Result type used across the SAS7BDAT decoder.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors surfaced while decoding a SAS7BDAT stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure while reading from the underlying data source.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The header or a page could not be interpreted as a SAS7BDAT structure.
    #[error("invalid SAS file format in {section}: {details}")]
    InvalidFormat {
        section: Section,
        details: Cow<'static, str>,
    },

    /// The stream ended before a structure that must be complete was read.
    #[error("truncated SAS file while reading {section}: {details}")]
    TruncatedFile {
        section: Section,
        details: Cow<'static, str>,
    },

    /// A caller asked for a column the file does not declare.
    #[error("unknown column name '{name}'")]
    UnknownColumnName { name: String },

    /// Neither the caller override nor the file-declared character set is usable.
    #[error("unsupported character encoding '{encoding}'")]
    UnsupportedEncoding { encoding: Cow<'static, str> },

    /// The file appears to be corrupt or inconsistent while processing a section.
    #[error("corrupted SAS file while processing {section}: {details}")]
    Corrupted {
        section: Section,
        details: Cow<'static, str>,
    },
}

impl Error {
    pub(crate) fn invalid_header(details: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFormat {
            section: Section::Header,
            details: details.into(),
        }
    }

    pub(crate) fn truncated_header(details: impl Into<Cow<'static, str>>) -> Self {
        Self::TruncatedFile {
            section: Section::Header,
            details: details.into(),
        }
    }
}

/// Logical section of the parser used for diagnostic reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Page { index: u64 },
    Subheader { page_index: u64, signature: u64 },
    Row { index: u64 },
    Column { index: u32 },
    Decompression { page_index: u64 },
}

impl Section {
    /// Helper constructor for subheader sections when the raw signature is known.
    #[must_use]
    pub const fn subheader(page_index: u64, signature: u64) -> Self {
        Self::Subheader {
            page_index,
            signature,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "file header"),
            Self::Page { index } => write!(f, "page {index}"),
            Self::Subheader {
                page_index,
                signature,
            } => write!(
                f,
                "subheader signature 0x{signature:016X} on page {page_index}"
            ),
            Self::Row { index } => write!(f, "row {index}"),
            Self::Column { index } => write!(f, "column {index}"),
            Self::Decompression { page_index } => {
                write!(f, "page {page_index} during decompression")
            }
        }
    }
}

/// Kind of column text that could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TextField {
    Name,
    Label,
    Format,
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Label => f.write_str("label"),
            Self::Format => f.write_str("format"),
        }
    }
}

/// Recoverable conditions recorded while decoding.
///
/// None of these abort reading; they are kept on the session so callers can
/// inspect what was skipped or left unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A subheader signature matched no known kind and was skipped.
    UnknownSubheaderSignature { page_index: u64, signature: u64 },
    /// A column field still points at a text block that never appeared.
    UnresolvedTextReference {
        column: usize,
        field: TextField,
        text_block: usize,
    },
    /// The stream ended in the middle of a page.
    TruncatedPage { page_index: u64, bytes_read: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSubheaderSignature {
                page_index,
                signature,
            } => write!(
                f,
                "unknown subheader signature 0x{signature:016X} on page {page_index}"
            ),
            Self::UnresolvedTextReference {
                column,
                field,
                text_block,
            } => write!(
                f,
                "column {column} {field} references missing text block {text_block}"
            ),
            Self::TruncatedPage {
                page_index,
                bytes_read,
            } => write!(f, "page {page_index} truncated after {bytes_read} bytes"),
        }
    }
}
