use crate::error::Result;
use crate::parser::byteorder::FieldReader;
use crate::parser::page::PageLayout;

/// Compression tag marking a pointer whose subheader was truncated away.
const TRUNCATED_SUBHEADER_ID: u8 = 1;
const COMPRESSED_SUBHEADER_ID: u8 = 4;
const COMPRESSED_SUBHEADER_TYPE: u8 = 1;

/// Subheader kinds recognised by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubheaderKind {
    RowSize,
    ColumnSize,
    SubheaderCounts,
    ColumnText,
    ColumnName,
    ColumnAttributes,
    FormatAndLabel,
    ColumnList,
    Data,
}

/// Signature table keyed by the sign-extended value read at the subheader
/// offset. 32-bit signatures are stored as negative `i32` values widened to
/// 64 bits, so one table covers both layouts.
const SIGNATURES: &[(u64, SubheaderKind)] = &[
    (0xFFFF_FFFF_F7F7_F7F7, SubheaderKind::RowSize),
    (0xFFFF_FFFF_F6F6_F6F6, SubheaderKind::ColumnSize),
    (0xFFFF_FFFF_FFFF_FC00, SubheaderKind::SubheaderCounts),
    (0xFFFF_FFFF_FFFF_FFFD, SubheaderKind::ColumnText),
    (0xFFFF_FFFF_FFFF_FFFF, SubheaderKind::ColumnName),
    (0xFFFF_FFFF_FFFF_FFFC, SubheaderKind::ColumnAttributes),
    (0xFFFF_FFFF_FFFF_FBFE, SubheaderKind::FormatAndLabel),
    (0xFFFF_FFFF_FFFF_FFFE, SubheaderKind::ColumnList),
    (0x0000_0000_F7F7_F7F7, SubheaderKind::RowSize),
    (0x0000_0000_F6F6_F6F6, SubheaderKind::ColumnSize),
    (0xF7F7_F7F7_0000_0000, SubheaderKind::RowSize),
    (0xF6F6_F6F6_0000_0000, SubheaderKind::ColumnSize),
    (0xF7F7_F7F7_FFFF_FBFE, SubheaderKind::RowSize),
    (0xF6F6_F6F6_FFFF_FBFE, SubheaderKind::ColumnSize),
    (0x00FC_FFFF_FFFF_FFFF, SubheaderKind::SubheaderCounts),
    (0xFDFF_FFFF_FFFF_FFFF, SubheaderKind::ColumnText),
    (0xFCFF_FFFF_FFFF_FFFF, SubheaderKind::ColumnAttributes),
    (0xFEFB_FFFF_FFFF_FFFF, SubheaderKind::FormatAndLabel),
    (0xFEFF_FFFF_FFFF_FFFF, SubheaderKind::ColumnList),
];

/// Exact signature lookup.
#[must_use]
pub fn lookup_signature(signature: u64) -> Option<SubheaderKind> {
    SIGNATURES
        .iter()
        .find(|(known, _)| *known == signature)
        .map(|(_, kind)| *kind)
}

/// Location and tags of one subheader, valid for the page it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubheaderPointer {
    pub offset: usize,
    pub length: usize,
    pub compression: u8,
    pub type_tag: u8,
}

impl SubheaderPointer {
    /// Reads pointer `index` from the page's pointer table.
    ///
    /// # Errors
    ///
    /// Returns an error if the pointer lies outside the page or carries a
    /// negative offset or length.
    pub fn read(fields: &FieldReader<'_>, layout: PageLayout, index: usize) -> Result<Self> {
        let width = fields.int_or_long_size();
        let base = layout.pointer_table_offset() + index * layout.pointer_length();
        Ok(Self {
            offset: fields.usize_field(base)?,
            length: fields.usize_field(base + width)?,
            compression: fields.u8(base + 2 * width)?,
            type_tag: fields.u8(base + 2 * width + 1)?,
        })
    }

    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.compression == TRUNCATED_SUBHEADER_ID
    }

    /// Tag combination used by row data stored as subheaders in compressed files.
    #[must_use]
    pub const fn looks_like_compressed_data(&self) -> bool {
        (self.compression == COMPRESSED_SUBHEADER_ID || self.compression == 0)
            && self.type_tag == COMPRESSED_SUBHEADER_TYPE
    }
}

/// Chooses the processor for a subheader: signature first, then the
/// compressed-data tag pattern when the file is compressed.
#[must_use]
pub fn classify(
    signature: u64,
    pointer: &SubheaderPointer,
    file_compressed: bool,
) -> Option<SubheaderKind> {
    lookup_signature(signature).or_else(|| {
        (file_compressed && pointer.looks_like_compressed_data()).then_some(SubheaderKind::Data)
    })
}
