mod byteorder;
mod encoding;
mod header;
mod metadata;
mod page;
mod rows;
mod subheaders;

pub use encoding::resolve_encoding;
pub use header::{Alignment, MAX_PAGE_LENGTH, SasHeader, parse_header};
pub use page::{PageKind, PageType};
pub use rows::compression::{Decompressor, RdcDecompressor, RleDecompressor, decompressor_for};
pub use rows::{CellDecoder, CellOptions, PercentPattern, RowSession, decode_string};
pub use subheaders::{SubheaderKind, lookup_signature};
