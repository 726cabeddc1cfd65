use encoding_rs::UTF_8;

use super::{MetadataBuilder, TextRef};
use crate::error::{Error, Section, TextField, Warning};
use crate::metadata::{ColumnKind, Compression, Endianness, FileProperties};
use crate::parser::byteorder::FieldReader;
use crate::parser::subheaders::{SubheaderKind, SubheaderPointer};

const L: usize = 4;

fn builder() -> MetadataBuilder {
    MetadataBuilder::new(FileProperties::new(Endianness::Little, false), UTF_8)
}

fn put_i16(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn pointer(offset: usize, length: usize) -> SubheaderPointer {
    SubheaderPointer {
        offset,
        length,
        compression: 0,
        type_tag: 0,
    }
}

fn run(builder: &mut MetadataBuilder, page: &[u8], kind: SubheaderKind, ptr: SubheaderPointer) {
    let fields = FieldReader::new(page, Endianness::Little, false, Section::Page { index: 0 });
    builder.process(kind, &fields, &ptr).expect("subheader processes");
}

/// Text subheader at `offset` holding `payload` after the two-byte size prefix.
fn text_subheader(page: &mut [u8], offset: usize, payload: &[u8]) -> usize {
    let size = payload.len() + 2;
    put_i16(page, offset + L, i16::try_from(size).expect("small block"));
    page[offset + L + 2..offset + L + size].copy_from_slice(payload);
    L + size
}

#[test]
fn row_size_only_fills_unset_counts() {
    let mut page = vec![0u8; 512];
    put_i32(&mut page, 5 * L, 16);
    put_i32(&mut page, 6 * L, 3);
    put_i32(&mut page, 15 * L, 2);
    put_i32(&mut page, 8 * L, 1);

    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::RowSize, pointer(0, 480));
    let props = builder.properties();
    assert_eq!(props.row_length, 16);
    assert_eq!(props.row_count, 3);
    assert_eq!(props.mix_page_row_count, 2);
    assert_eq!(props.deleted_row_count, 1);

    put_i32(&mut page, 6 * L, 99);
    run(&mut builder, &page, SubheaderKind::RowSize, pointer(0, 480));
    assert_eq!(builder.properties().row_count, 3);
}

#[test]
fn first_text_block_resolves_compression_and_file_label() {
    let mut page = vec![0u8; 1024];
    let label_base = 82 * L;
    put_i16(&mut page, label_base + 24, 10);
    put_i16(&mut page, label_base + 26, 5);
    put_i16(&mut page, label_base + 36, 2);
    put_i16(&mut page, label_base + 38, 8);

    let text_offset = 600;
    let len = text_subheader(&mut page, text_offset, b"SASYZCR2LABEL");

    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::RowSize, pointer(0, 480));
    run(&mut builder, &page, SubheaderKind::ColumnText, pointer(text_offset, len));

    assert_eq!(builder.text_store().len(), 1);
    assert_eq!(builder.properties().compression, Compression::Binary);
    assert_eq!(builder.properties().file_label, "LABEL");
}

#[test]
fn unknown_compression_literal_leaves_file_uncompressed() {
    let mut page = vec![0u8; 1024];
    let label_base = 82 * L;
    put_i16(&mut page, label_base + 36, 2);
    put_i16(&mut page, label_base + 38, 8);
    let len = text_subheader(&mut page, 600, b"SASYZCRX");

    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::RowSize, pointer(0, 480));
    run(&mut builder, &page, SubheaderKind::ColumnText, pointer(600, len));
    assert_eq!(builder.properties().compression, Compression::None);
}

#[test]
fn columns_join_names_attributes_and_formats_positionally() {
    let mut page = vec![0u8; 1024];
    let text_len = text_subheader(&mut page, 0, b"AGE NAME DATE");

    // Two name entries.
    let names_at = 100;
    for (i, (offset, length)) in [(2i16, 3i16), (6, 4)].into_iter().enumerate() {
        let entry = names_at + L + 8 * (i + 1);
        put_i16(&mut page, entry, 0);
        put_i16(&mut page, entry + 2, offset);
        put_i16(&mut page, entry + 4, length);
    }
    let names_len = 2 * L + 12 + 2 * 8;

    // Two attribute entries: numeric at 0 (8 bytes), text at 8 (4 bytes).
    let attrs_at = 200;
    let stride = L + 8;
    for (i, (offset, length, kind)) in [(0i32, 8i32, 1u8), (8, 4, 2)].into_iter().enumerate() {
        let entry = attrs_at + i * stride;
        put_i32(&mut page, entry + L + 8, offset);
        put_i32(&mut page, entry + 2 * L + 8, length);
        page[entry + 2 * L + 14] = kind;
    }
    let attrs_len = 2 * L + 12 + 2 * stride;

    // Format/label for the first column: format "DATE" width 9.
    let format_at = 300;
    let base = format_at + 3 * L;
    put_i16(&mut page, base, 9);
    put_i16(&mut page, base + 22, 0);
    put_i16(&mut page, base + 24, 11);
    put_i16(&mut page, base + 26, 4);
    // Second column: no format, label "NAME".
    let second_at = 400;
    let base2 = second_at + 3 * L;
    put_i16(&mut page, base2 + 28, 0);
    put_i16(&mut page, base2 + 30, 6);
    put_i16(&mut page, base2 + 32, 4);

    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::ColumnText, pointer(0, text_len));
    run(&mut builder, &page, SubheaderKind::ColumnName, pointer(names_at, names_len));
    run(&mut builder, &page, SubheaderKind::ColumnAttributes, pointer(attrs_at, attrs_len));
    run(&mut builder, &page, SubheaderKind::FormatAndLabel, pointer(format_at, 64));
    run(&mut builder, &page, SubheaderKind::FormatAndLabel, pointer(second_at, 64));

    let columns = builder.columns();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].id, 1);
    assert_eq!(columns[0].name, "AGE");
    assert_eq!(columns[0].format.to_string(), "DATE9.");
    assert_eq!(columns[0].kind, ColumnKind::Numeric);
    assert_eq!(columns[0].length, 8);
    assert_eq!(columns[1].id, 2);
    assert_eq!(columns[1].name, "NAME");
    assert_eq!(columns[1].label, "NAME");
    assert!(columns[1].format.is_empty());
    assert_eq!(columns[1].kind, ColumnKind::Text);
    assert_eq!(builder.slots()[1].offset, 8);
}

#[test]
fn forward_references_are_back_filled_once_the_block_arrives() {
    let mut page = vec![0u8; 1024];
    let names_at = 0;
    let entry = names_at + L + 8;
    put_i16(&mut page, entry, 1);
    put_i16(&mut page, entry + 2, 2);
    put_i16(&mut page, entry + 4, 3);
    let names_len = 2 * L + 12 + 8;

    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::ColumnName, pointer(names_at, names_len));
    assert_eq!(builder.pending().entries().len(), 1);
    assert_eq!(builder.pending().entries()[0].text, TextRef::new(1, 2, 3));
    assert_eq!(
        builder.unresolved_warnings(),
        vec![Warning::UnresolvedTextReference {
            column: 0,
            field: TextField::Name,
            text_block: 1,
        }]
    );

    let first = text_subheader(&mut page, 100, b"zero");
    let second = text_subheader(&mut page, 200, b"ABC");
    run(&mut builder, &page, SubheaderKind::ColumnText, pointer(100, first));
    run(&mut builder, &page, SubheaderKind::ColumnText, pointer(200, second));

    assert_eq!(builder.resolve_pending().unwrap(), 1);
    assert!(builder.pending().is_empty());
    assert!(builder.unresolved_warnings().is_empty());

    // Column built afterwards picks up the back-filled name.
    let attrs_at = 300;
    put_i32(&mut page, attrs_at + 2 * L + 8, 8);
    page[attrs_at + 2 * L + 14] = 1;
    run(&mut builder, &page, SubheaderKind::ColumnAttributes, pointer(attrs_at, 2 * L + 12 + L + 8));
    run(&mut builder, &page, SubheaderKind::FormatAndLabel, pointer(400, 64));
    assert_eq!(builder.columns()[0].name, "ABC");
}

#[test]
fn unresolved_label_stays_at_placeholder() {
    let mut page = vec![0u8; 512];
    let attrs_at = 0;
    put_i32(&mut page, attrs_at + 2 * L + 8, 8);
    page[attrs_at + 2 * L + 14] = 1;
    let format_at = 100;
    put_i16(&mut page, format_at + 3 * L + 28, 5);
    put_i16(&mut page, format_at + 3 * L + 32, 4);

    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::ColumnAttributes, pointer(attrs_at, 2 * L + 12 + L + 8));
    run(&mut builder, &page, SubheaderKind::FormatAndLabel, pointer(format_at, 64));

    assert_eq!(builder.resolve_pending().unwrap(), 0);
    assert_eq!(builder.columns()[0].label, "");
    // Label and the empty format reference both wait on missing blocks.
    assert_eq!(builder.unresolved_warnings().len(), 2);
}

#[test]
fn format_before_attributes_is_corruption() {
    let page = vec![0u8; 256];
    let fields = FieldReader::new(&page, Endianness::Little, false, Section::Page { index: 0 });
    let err = builder()
        .process(SubheaderKind::FormatAndLabel, &fields, &pointer(0, 64))
        .unwrap_err();
    assert!(matches!(err, Error::Corrupted { .. }));
}

#[test]
fn column_size_reads_count() {
    let mut page = vec![0u8; 64];
    put_i32(&mut page, L, 7);
    let mut builder = builder();
    run(&mut builder, &page, SubheaderKind::ColumnSize, pointer(0, 16));
    assert_eq!(builder.properties().column_count, 7);
}
