//! Forward-only decoder for SAS7BDAT dataset files.
//!
//! [`SasReader`] parses the header and metadata pages, then yields rows of
//! [`Value`]s. Date, time and datetime columns are converted according to
//! [`OutputDateType`], reproducing the SAS display formats when a formatted
//! string is requested.

pub mod error;
pub mod logger;
pub mod metadata;
pub mod parser;
pub mod reader;
pub mod temporal;
pub mod value;

pub use crate::error::{Error, Result, Section, TextField, Warning};
pub use metadata::{Column, ColumnFormat, ColumnKind, Compression, Endianness, FileProperties};
pub use parser::PercentPattern;
pub use reader::{ReadOptions, Rows, SasReader};
pub use temporal::{OutputDateType, TemporalFormatter};
pub use value::Value;
