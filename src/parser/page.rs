use crate::error::Result;
use crate::parser::byteorder::FieldReader;

const PAGE_BIT_OFFSET_X86: usize = 16;
const PAGE_BIT_OFFSET_X64: usize = 32;
const SUBHEADER_POINTER_LENGTH_X86: usize = 12;
const SUBHEADER_POINTER_LENGTH_X64: usize = 24;
const PAGE_DELETED_POINTER_OFFSET_X86: usize = 12;
const PAGE_DELETED_POINTER_OFFSET_X64: usize = 24;

const PAGE_TYPE_OFFSET: usize = 0;
const BLOCK_COUNT_OFFSET: usize = 2;
const SUBHEADER_COUNT_OFFSET: usize = 4;
/// Distance from the bit offset to the first subheader pointer.
pub const SUBHEADER_POINTERS_OFFSET: usize = 8;
const BITS_IN_BYTE: usize = 8;

pub const PAGE_META_TYPE_1: i16 = 0;
pub const PAGE_META_TYPE_2: i16 = 16384;
pub const PAGE_CMETA_TYPE: i16 = 128;
pub const PAGE_DATA_TYPE: i16 = 256;
pub const PAGE_DATA_TYPE_2: i16 = 384;
pub const PAGE_MIX_TYPE_1: i16 = 512;
pub const PAGE_MIX_TYPE_2: i16 = 640;
pub const PAGE_AMD_TYPE: i16 = 1024;

/// Page family that decides how rows are located on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Meta,
    Data,
    Mix,
    Amd,
}

/// Classified page type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageType {
    pub code: i16,
    pub kind: PageKind,
    /// Slots on this page are filtered through a deleted-row bitmap.
    pub has_deletions: bool,
}

impl PageType {
    /// Maps a raw page type code to its family; unknown codes yield `None`.
    #[must_use]
    pub const fn classify(code: i16) -> Option<Self> {
        let (kind, has_deletions) = match code {
            PAGE_META_TYPE_1 | PAGE_META_TYPE_2 | PAGE_CMETA_TYPE => (PageKind::Meta, false),
            PAGE_DATA_TYPE => (PageKind::Data, false),
            PAGE_DATA_TYPE_2 => (PageKind::Data, true),
            PAGE_MIX_TYPE_1 => (PageKind::Mix, false),
            PAGE_MIX_TYPE_2 => (PageKind::Mix, true),
            PAGE_AMD_TYPE => (PageKind::Amd, false),
            _ => return None,
        };
        Some(Self {
            code,
            kind,
            has_deletions,
        })
    }

    #[must_use]
    pub const fn is_compressed_meta(self) -> bool {
        self.code == PAGE_CMETA_TYPE
    }

    /// Pages whose subheader pointer table is walked by the dispatcher.
    #[must_use]
    pub const fn carries_subheaders(self) -> bool {
        matches!(self.kind, PageKind::Meta | PageKind::Mix | PageKind::Amd)
    }
}

/// Bitness-dependent page geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub u64: bool,
}

impl PageLayout {
    #[must_use]
    pub const fn new(u64: bool) -> Self {
        Self { u64 }
    }

    #[must_use]
    pub const fn bit_offset(self) -> usize {
        if self.u64 {
            PAGE_BIT_OFFSET_X64
        } else {
            PAGE_BIT_OFFSET_X86
        }
    }

    #[must_use]
    pub const fn pointer_length(self) -> usize {
        if self.u64 {
            SUBHEADER_POINTER_LENGTH_X64
        } else {
            SUBHEADER_POINTER_LENGTH_X86
        }
    }

    #[must_use]
    pub const fn pointer_table_offset(self) -> usize {
        self.bit_offset() + SUBHEADER_POINTERS_OFFSET
    }

    const fn deleted_pointer_offset(self) -> usize {
        if self.u64 {
            PAGE_DELETED_POINTER_OFFSET_X64
        } else {
            PAGE_DELETED_POINTER_OFFSET_X86
        }
    }

    /// Start of the first row slot on a data page.
    #[must_use]
    pub const fn data_rows_offset(self) -> usize {
        self.pointer_table_offset()
    }

    /// Start of the first row slot on a mix page: after the pointer table,
    /// rounded so the rows start on an 8-byte boundary.
    #[must_use]
    pub const fn mix_rows_offset(self, subheader_count: usize) -> usize {
        let table_end = self.pointer_table_offset() + subheader_count * self.pointer_length();
        table_end + table_end % BITS_IN_BYTE
    }
}

/// Fields from the fixed page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub type_code: i16,
    pub block_count: usize,
    pub subheader_count: usize,
}

impl PageHeader {
    /// # Errors
    ///
    /// Returns an error if the page buffer is shorter than the page header.
    pub fn read(fields: &FieldReader<'_>, layout: PageLayout) -> Result<Self> {
        let base = layout.bit_offset();
        Ok(Self {
            type_code: fields.i16(base + PAGE_TYPE_OFFSET)?,
            block_count: usize::from(fields.u16(base + BLOCK_COUNT_OFFSET)?),
            subheader_count: usize::from(fields.u16(base + SUBHEADER_COUNT_OFFSET)?),
        })
    }

    #[must_use]
    pub const fn page_type(&self) -> Option<PageType> {
        PageType::classify(self.type_code)
    }
}

/// Per-page bitmap of logically deleted row slots, most significant bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedRowBitmap {
    bits: Vec<u8>,
}

impl DeletedRowBitmap {
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: Vec::new() }
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bits: bytes.to_vec(),
        }
    }

    /// Locates and copies the bitmap from a buffered page.
    ///
    /// The bitmap sits after the pointer table and every row slot, relative to
    /// the deleted pointer stored in the page header.
    ///
    /// # Errors
    ///
    /// Returns an error if the pointer or bitmap lies outside the page.
    pub fn read(
        fields: &FieldReader<'_>,
        layout: PageLayout,
        header: &PageHeader,
        row_length: usize,
    ) -> Result<Self> {
        let pointer = fields.i32(layout.deleted_pointer_offset())?;
        let Ok(pointer) = usize::try_from(pointer) else {
            return Ok(Self::empty());
        };
        let base = layout.bit_offset() + SUBHEADER_POINTERS_OFFSET;
        let table_len = header.subheader_count * layout.pointer_length();
        let align_correction = (base + SUBHEADER_POINTERS_OFFSET + table_len) % BITS_IN_BYTE;
        let slots = header.block_count.saturating_sub(header.subheader_count);
        let offset = base + pointer + align_correction + table_len + slots * row_length;
        let len = slots.div_ceil(BITS_IN_BYTE);
        Ok(Self::from_bytes(fields.bytes(offset, len)?))
    }

    /// Whether `slot` is marked deleted; slots past the bitmap are live.
    #[must_use]
    pub fn is_deleted(&self, slot: usize) -> bool {
        self.bits
            .get(slot / BITS_IN_BYTE)
            .is_some_and(|byte| byte & (0x80 >> (slot % BITS_IN_BYTE)) != 0)
    }

    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}
