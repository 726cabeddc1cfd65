#![allow(dead_code, clippy::pedantic)]
//! Builds synthetic SAS7BDAT images in memory.
//!
//! Only std is used here so the unit tests inside the crate can include this
//! file with `#[path]` as well.

pub const PAGE_META: i16 = 0;
pub const PAGE_CMETA: i16 = 128;
pub const PAGE_DATA: i16 = 256;
pub const PAGE_DATA_DELETED: i16 = 384;
pub const PAGE_MIX: i16 = 512;
pub const PAGE_MIX_DELETED: i16 = 640;
pub const PAGE_AMD: i16 = 1024;

pub const ENCODING_UTF8: u8 = 20;
pub const ENCODING_WLATIN1: u8 = 62;

const MAGIC: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];
const CHECKER: u8 = 0x33;
const HEADER_LENGTH: usize = 1024;

const SIG_ROW_SIZE: i32 = 0xF7F7_F7F7_u32 as i32;
const SIG_COLUMN_SIZE: i32 = 0xF6F6_F6F6_u32 as i32;
const SIG_COLUMN_TEXT: i32 = -3;
const SIG_COLUMN_NAME: i32 = -1;
const SIG_COLUMN_ATTRIBUTES: i32 = -4;
const SIG_FORMAT_AND_LABEL: i32 = -1026;
const SIG_COLUMN_LIST: i32 = -2;

/// Offset of the first string inside a text block; the block starts with
/// its two-byte size.
const TEXT_BLOCK_PREFIX: usize = 8;

/// Bitness and alignment of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub u64: bool,
    pub align1: bool,
}

impl Layout {
    pub const X86: Self = Self {
        u64: false,
        align1: false,
    };
    pub const X64: Self = Self {
        u64: true,
        align1: false,
    };

    pub fn word(self) -> usize {
        if self.u64 { 8 } else { 4 }
    }

    fn bit_offset(self) -> usize {
        if self.u64 { 32 } else { 16 }
    }

    fn pointer_length(self) -> usize {
        if self.u64 { 24 } else { 12 }
    }

    fn deleted_pointer_offset(self) -> usize {
        if self.u64 { 24 } else { 12 }
    }

    fn put_word(self, buf: &mut [u8], offset: usize, value: i64) {
        if self.u64 {
            buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        } else {
            let value = i32::try_from(value).expect("fits in 32 bits");
            buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn subheader(self, signature: i32, len: usize) -> Vec<u8> {
        let mut body = vec![0u8; len];
        self.put_word(&mut body, 0, i64::from(signature));
        body
    }
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// One subheader body with the tags stored in its pointer.
#[derive(Debug, Clone)]
pub struct Subheader {
    pub body: Vec<u8>,
    pub compression: u8,
    pub type_tag: u8,
}

impl Subheader {
    fn plain(body: Vec<u8>) -> Self {
        Self {
            body,
            compression: 0,
            type_tag: 0,
        }
    }

    /// Row data stored as a compressed subheader.
    pub fn compressed_row(bytes: &[u8]) -> Self {
        Self {
            body: bytes.to_vec(),
            compression: 4,
            type_tag: 1,
        }
    }

    /// Pointer whose subheader was truncated away.
    pub fn truncated() -> Self {
        Self {
            body: vec![0u8; 16],
            compression: 1,
            type_tag: 0,
        }
    }
}

/// (text block index, offset, length)
pub type TextRef = (u16, u16, u16);

pub const EMPTY_TEXT: TextRef = (0, 0, 0);

/// Accumulates strings into one text block.
#[derive(Debug, Clone)]
pub struct TextBlock {
    index: u16,
    bytes: Vec<u8>,
}

impl TextBlock {
    pub fn new(index: u16) -> Self {
        Self {
            index,
            bytes: vec![0u8; TEXT_BLOCK_PREFIX],
        }
    }

    pub fn add(&mut self, text: &str) -> TextRef {
        if text.is_empty() {
            return (self.index, 0, 0);
        }
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(text.as_bytes());
        // Keep entries four-byte aligned like SAS does.
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(b' ');
        }
        (self.index, offset as u16, text.len() as u16)
    }

    pub fn subheader(&self, layout: Layout) -> Subheader {
        let mut block = self.bytes.clone();
        let size = block.len() as u16;
        put_u16(&mut block, 0, size);
        let mut body = layout.subheader(SIG_COLUMN_TEXT, layout.word());
        body.extend_from_slice(&block);
        Subheader::plain(body)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RowCounts {
    pub row_length: u64,
    pub row_count: u64,
    pub deleted_row_count: u64,
    pub mix_page_row_count: u64,
}

pub fn row_size(layout: Layout, counts: RowCounts, label: TextRef, compression: TextRef) -> Subheader {
    let w = layout.word();
    let mut body = layout.subheader(SIG_ROW_SIZE, 82 * w + 48);
    layout.put_word(&mut body, 5 * w, counts.row_length as i64);
    layout.put_word(&mut body, 6 * w, counts.row_count as i64);
    layout.put_word(&mut body, 8 * w, counts.deleted_row_count as i64);
    layout.put_word(&mut body, 15 * w, counts.mix_page_row_count as i64);
    let text = 82 * w;
    put_u16(&mut body, text + 24, label.1);
    put_u16(&mut body, text + 26, label.2);
    put_u16(&mut body, text + 36, compression.1);
    put_u16(&mut body, text + 38, compression.2);
    Subheader::plain(body)
}

pub fn column_size(layout: Layout, count: usize) -> Subheader {
    let w = layout.word();
    let mut body = layout.subheader(SIG_COLUMN_SIZE, 3 * w);
    layout.put_word(&mut body, w, count as i64);
    Subheader::plain(body)
}

pub fn column_names(layout: Layout, names: &[TextRef]) -> Subheader {
    let w = layout.word();
    let mut body = layout.subheader(SIG_COLUMN_NAME, 2 * w + 12 + 8 * names.len());
    for (i, (index, offset, length)) in names.iter().enumerate() {
        let base = w + 8 * (i + 1);
        put_u16(&mut body, base, *index);
        put_u16(&mut body, base + 2, *offset);
        put_u16(&mut body, base + 4, *length);
    }
    Subheader::plain(body)
}

/// `(data offset, data length, numeric)` per column.
pub fn column_attributes(layout: Layout, slots: &[(usize, usize, bool)]) -> Subheader {
    let w = layout.word();
    let stride = w + 8;
    let mut body = layout.subheader(SIG_COLUMN_ATTRIBUTES, 2 * w + 12 + stride * slots.len());
    for (i, (offset, length, numeric)) in slots.iter().enumerate() {
        let base = i * stride;
        layout.put_word(&mut body, base + w + 8, *offset as i64);
        put_i32(&mut body, base + 2 * w + 8, *length as i32);
        body[base + 2 * w + 14] = if *numeric { 1 } else { 2 };
    }
    Subheader::plain(body)
}

pub fn format_and_label(
    layout: Layout,
    width: u16,
    precision: u16,
    format: TextRef,
    label: TextRef,
) -> Subheader {
    let w = layout.word();
    let mut body = layout.subheader(SIG_FORMAT_AND_LABEL, 3 * w + 64);
    let base = 3 * w;
    put_u16(&mut body, base, width);
    put_u16(&mut body, base + 2, precision);
    put_u16(&mut body, base + 22, format.0);
    put_u16(&mut body, base + 24, format.1);
    put_u16(&mut body, base + 26, format.2);
    put_u16(&mut body, base + 28, label.0);
    put_u16(&mut body, base + 30, label.1);
    put_u16(&mut body, base + 32, label.2);
    Subheader::plain(body)
}

pub fn column_list(layout: Layout) -> Subheader {
    Subheader::plain(layout.subheader(SIG_COLUMN_LIST, 4 * layout.word()))
}

/// Subheader whose signature matches nothing known.
pub fn unknown_subheader(layout: Layout) -> Subheader {
    Subheader::plain(layout.subheader(0x1234_5678, 2 * layout.word()))
}

/// One page image: subheaders are stored from the page end backwards, rows
/// after the pointer table.
#[derive(Debug, Clone)]
pub struct Page {
    pub type_code: i16,
    pub subheaders: Vec<Subheader>,
    pub rows: Vec<Vec<u8>>,
    pub deleted: Vec<usize>,
}

impl Page {
    pub fn new(type_code: i16) -> Self {
        Self {
            type_code,
            subheaders: Vec::new(),
            rows: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn with_subheaders(mut self, subheaders: Vec<Subheader>) -> Self {
        self.subheaders = subheaders;
        self
    }

    pub fn with_rows(mut self, rows: Vec<Vec<u8>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_deleted(mut self, slots: &[usize]) -> Self {
        self.deleted = slots.to_vec();
        self
    }

    pub fn encode(&self, layout: Layout, page_length: usize, row_length: usize) -> Vec<u8> {
        let mut buf = vec![0u8; page_length];
        let bit = layout.bit_offset();
        let count = self.subheaders.len();
        let table_end = bit + 8 + count * layout.pointer_length();
        let rows_start = if matches!(self.type_code, PAGE_MIX | PAGE_MIX_DELETED) {
            table_end + table_end % 8
        } else {
            table_end
        };

        buf[bit..bit + 2].copy_from_slice(&self.type_code.to_le_bytes());
        put_u16(&mut buf, bit + 2, (count + self.rows.len()) as u16);
        put_u16(&mut buf, bit + 4, count as u16);

        let w = layout.word();
        let mut end = page_length;
        for (i, subheader) in self.subheaders.iter().enumerate() {
            end = (end - subheader.body.len()) & !7;
            buf[end..end + subheader.body.len()].copy_from_slice(&subheader.body);
            let pointer = bit + 8 + i * layout.pointer_length();
            layout.put_word(&mut buf, pointer, end as i64);
            layout.put_word(&mut buf, pointer + w, subheader.body.len() as i64);
            buf[pointer + 2 * w] = subheader.compression;
            buf[pointer + 2 * w + 1] = subheader.type_tag;
        }

        for (slot, row) in self.rows.iter().enumerate() {
            let start = rows_start + slot * row_length;
            buf[start..start + row.len()].copy_from_slice(row);
        }

        let bitmap = rows_start + self.rows.len() * row_length;
        put_i32(&mut buf, layout.deleted_pointer_offset(), 0);
        for &slot in &self.deleted {
            buf[bitmap + slot / 8] |= 0x80 >> (slot % 8);
        }
        assert!(
            bitmap + self.rows.len().div_ceil(8) <= end,
            "rows and subheaders overlap on the page"
        );
        buf
    }
}

/// Column description used to lay out metadata and encode rows.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub label: String,
    pub format: String,
    pub width: u16,
    pub precision: u16,
    pub numeric: bool,
    pub offset: usize,
    pub length: usize,
}

impl ColumnSpec {
    pub fn numeric(name: &str, offset: usize) -> Self {
        Self {
            name: name.to_owned(),
            label: String::new(),
            format: String::new(),
            width: 0,
            precision: 0,
            numeric: true,
            offset,
            length: 8,
        }
    }

    pub fn text(name: &str, offset: usize, length: usize) -> Self {
        Self {
            name: name.to_owned(),
            label: String::new(),
            format: String::new(),
            width: 0,
            precision: 0,
            numeric: false,
            offset,
            length,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_format(mut self, format: &str, width: u16, precision: u16) -> Self {
        self.format = format.to_owned();
        self.width = width;
        self.precision = precision;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }
}

/// Cell written into a row image.
#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Num(f64),
    Text(&'a str),
    Bytes(&'a [u8]),
}

/// A whole file: header fields, columns and the pages after the header.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub layout: Layout,
    pub page_length: usize,
    pub encoding: u8,
    pub name: String,
    pub file_label: String,
    pub compression: String,
    pub created: f64,
    pub columns: Vec<ColumnSpec>,
}

impl Dataset {
    pub fn new(layout: Layout, columns: Vec<ColumnSpec>) -> Self {
        Self {
            layout,
            page_length: 4096,
            encoding: ENCODING_UTF8,
            name: "FIXTURE".to_owned(),
            file_label: String::new(),
            compression: String::new(),
            created: 0.0,
            columns,
        }
    }

    pub fn row_length(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.offset + column.length)
            .max()
            .unwrap_or(0)
    }

    pub fn row(&self, cells: &[Cell<'_>]) -> Vec<u8> {
        let mut row = vec![0u8; self.row_length()];
        for (column, cell) in self.columns.iter().zip(cells) {
            let slot = &mut row[column.offset..column.offset + column.length];
            match cell {
                Cell::Num(value) => {
                    let bytes = value.to_le_bytes();
                    // Short numerics keep the most significant bytes.
                    slot.copy_from_slice(&bytes[8 - column.length..]);
                }
                Cell::Text(text) => {
                    slot.fill(b' ');
                    slot[..text.len()].copy_from_slice(text.as_bytes());
                }
                Cell::Bytes(bytes) => {
                    slot.fill(b' ');
                    slot[..bytes.len()].copy_from_slice(bytes);
                }
            }
        }
        row
    }

    /// Every metadata subheader for the columns, with all text in block 0.
    pub fn metadata(&self, counts: RowCounts) -> Vec<Subheader> {
        let layout = self.layout;
        let mut text = TextBlock::new(0);
        let compression = text.add(&self.compression);
        let file_label = text.add(&self.file_label);
        let names: Vec<TextRef> = self.columns.iter().map(|c| text.add(&c.name)).collect();
        let formats: Vec<TextRef> = self.columns.iter().map(|c| text.add(&c.format)).collect();
        let labels: Vec<TextRef> = self.columns.iter().map(|c| text.add(&c.label)).collect();

        let slots: Vec<(usize, usize, bool)> = self
            .columns
            .iter()
            .map(|c| (c.offset, c.length, c.numeric))
            .collect();

        let mut subheaders = vec![
            row_size(layout, counts, file_label, compression),
            column_size(layout, self.columns.len()),
            text.subheader(layout),
            column_names(layout, &names),
            column_attributes(layout, &slots),
        ];
        for ((column, format), label) in self.columns.iter().zip(formats).zip(labels) {
            subheaders.push(format_and_label(
                layout,
                column.width,
                column.precision,
                format,
                label,
            ));
        }
        subheaders.push(column_list(layout));
        subheaders
    }

    pub fn counts(&self, row_count: u64) -> RowCounts {
        RowCounts {
            row_length: self.row_length() as u64,
            row_count,
            deleted_row_count: 0,
            mix_page_row_count: 0,
        }
    }

    pub fn header(&self, page_count: usize) -> Vec<u8> {
        let layout = self.layout;
        let a1 = if layout.align1 { 4 } else { 0 };
        let total = a1 + if layout.u64 { 4 } else { 0 };
        let mut bytes = vec![0u8; HEADER_LENGTH];
        bytes[..32].copy_from_slice(&MAGIC);
        bytes[32] = if layout.u64 { CHECKER } else { 0x22 };
        bytes[35] = if layout.align1 { CHECKER } else { 0x22 };
        bytes[37] = 0x01;
        bytes[70] = self.encoding;
        bytes[92..92 + self.name.len()].copy_from_slice(self.name.as_bytes());
        bytes[156..164].copy_from_slice(b"DATA    ");
        bytes[164 + a1..172 + a1].copy_from_slice(&self.created.to_le_bytes());
        bytes[172 + a1..180 + a1].copy_from_slice(&self.created.to_le_bytes());
        put_i32(&mut bytes, 196 + a1, HEADER_LENGTH as i32);
        put_i32(&mut bytes, 200 + a1, self.page_length as i32);
        layout.put_word(&mut bytes, 204 + a1, page_count as i64);
        bytes[216 + total..224 + total].copy_from_slice(b"9.0401M6");
        bytes[224 + total..233 + total].copy_from_slice(b"X64_10PRO");
        bytes[256 + total..264 + total].copy_from_slice(b"Fixtures");
        bytes
    }

    /// Header followed by `pages`.
    pub fn build(&self, pages: &[Page]) -> Vec<u8> {
        let row_length = self.row_length();
        let mut bytes = self.header(pages.len());
        for page in pages {
            bytes.extend(page.encode(self.layout, self.page_length, row_length));
        }
        bytes
    }
}
