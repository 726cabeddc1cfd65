use std::io::{self, Read};

use encoding_rs::Encoding;
use time::OffsetDateTime;

use crate::error::{Error, Result, Section};
use crate::logger::log_warn;
use crate::metadata::{Endianness, FileProperties};
use crate::parser::byteorder::{BYTES_IN_DOUBLE, FieldReader};
use crate::parser::encoding::{lookup_encoding, nul_terminated, resolve_encoding};
use crate::temporal::TemporalFormatter;

const SAS7BDAT_MAGIC_NUMBER: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xEA, 0x81, 0x60,
    0xB3, 0x14, 0x11, 0xCF, 0xBD, 0x92, 0x08, 0x00, 0x09, 0xC7, 0x31, 0x8C, 0x18, 0x1F, 0x10, 0x11,
];

/// Byte that marks both the 64-bit layout and the align-1 padding.
const ALIGN_CHECKER_VALUE: u8 = 0x33;
const U64_FLAG_OFFSET: usize = 32;
const ALIGN_1_FLAG_OFFSET: usize = 35;
const ALIGN_1_VALUE: usize = 4;
const ALIGN_2_VALUE: usize = 4;

const ENDIANNESS_OFFSET: usize = 37;
const ENCODING_OFFSET: usize = 70;
const DATASET_OFFSET: usize = 92;
const DATASET_LENGTH: usize = 64;
const FILE_TYPE_OFFSET: usize = 156;
const FILE_TYPE_LENGTH: usize = 8;

// Shifted by align-1.
const DATE_CREATED_OFFSET: usize = 164;
const DATE_MODIFIED_OFFSET: usize = 172;
const HEADER_SIZE_OFFSET: usize = 196;
const PAGE_SIZE_OFFSET: usize = 200;
const PAGE_COUNT_OFFSET: usize = 204;

// Shifted by align-1 + align-2.
const SAS_RELEASE_OFFSET: usize = 216;
const SAS_RELEASE_LENGTH: usize = 8;
const SERVER_TYPE_OFFSET: usize = 224;
const OS_VERSION_OFFSET: usize = 240;
const OS_MAKER_OFFSET: usize = 256;
const OS_NAME_OFFSET: usize = 272;
const OS_FIELD_LENGTH: usize = 16;

const LITTLE_ENDIAN_CHECKER: u8 = 0x01;
const BIG_ENDIAN_CHECKER: u8 = 0x00;

/// Sanity bound on the declared page length.
pub const MAX_PAGE_LENGTH: u32 = 10_000_000;

/// Alignment flags detected from the two header checker bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub u64: bool,
    pub align1: usize,
    pub align2: usize,
}

impl Alignment {
    #[must_use]
    pub const fn detect(u64_flag: u8, align1_flag: u8) -> Self {
        let u64 = u64_flag == ALIGN_CHECKER_VALUE;
        Self {
            u64,
            align1: if align1_flag == ALIGN_CHECKER_VALUE {
                ALIGN_1_VALUE
            } else {
                0
            },
            align2: if u64 { ALIGN_2_VALUE } else { 0 },
        }
    }

    #[must_use]
    pub const fn total(self) -> usize {
        self.align1 + self.align2
    }

    /// Length of the header prefix that holds every field read here.
    #[must_use]
    pub const fn prefix_len(self) -> usize {
        OS_NAME_OFFSET + self.total() + OS_FIELD_LENGTH
    }
}

/// Result of header resolution: the initial file properties plus the
/// character decoder selected for text cells.
#[derive(Debug, Clone)]
pub struct SasHeader {
    pub properties: FileProperties,
    pub encoding: &'static Encoding,
}

/// Parses the file header and leaves `reader` positioned at the first page.
///
/// # Errors
///
/// Returns [`Error::TruncatedFile`] when the stream ends inside the header,
/// [`Error::InvalidFormat`] for a bad endianness byte or page length, and
/// [`Error::UnsupportedEncoding`] when no usable character set is found.
pub fn parse_header<R: Read>(reader: &mut R, encoding_override: Option<&str>) -> Result<SasHeader> {
    let mut prefix = vec![0u8; ALIGN_1_FLAG_OFFSET + 1];
    read_header_bytes(reader, &mut prefix)?;
    let alignment = Alignment::detect(prefix[U64_FLAG_OFFSET], prefix[ALIGN_1_FLAG_OFFSET]);

    let already_read = prefix.len();
    prefix.resize(alignment.prefix_len(), 0);
    read_header_bytes(reader, &mut prefix[already_read..])?;

    if prefix[..SAS7BDAT_MAGIC_NUMBER.len()] != SAS7BDAT_MAGIC_NUMBER {
        log_warn("header magic number does not match SAS7BDAT; continuing");
    }

    let endianness = match prefix[ENDIANNESS_OFFSET] {
        LITTLE_ENDIAN_CHECKER => Endianness::Little,
        BIG_ENDIAN_CHECKER => Endianness::Big,
        other => {
            return Err(Error::invalid_header(format!(
                "endianness byte 0x{other:02X} is neither little- nor big-endian"
            )));
        }
    };

    let fields = FieldReader::new(&prefix, endianness, alignment.u64, Section::Header);
    let mut properties = FileProperties::new(endianness, alignment.u64);

    let file_encoding = lookup_encoding(fields.u8(ENCODING_OFFSET)?);
    let encoding = select_encoding(encoding_override, file_encoding)?;
    properties.encoding = file_encoding.map(str::to_owned);

    properties.name = header_string(&fields, DATASET_OFFSET, DATASET_LENGTH, encoding)?;
    properties.file_type = header_string(&fields, FILE_TYPE_OFFSET, FILE_TYPE_LENGTH, encoding)?;

    let a1 = alignment.align1;
    properties.date_created = header_timestamp(&fields, DATE_CREATED_OFFSET + a1)?;
    properties.date_modified = header_timestamp(&fields, DATE_MODIFIED_OFFSET + a1)?;

    let header_length = fields.i32(HEADER_SIZE_OFFSET + a1)?;
    let page_length = fields.i32(PAGE_SIZE_OFFSET + a1)?;
    let page_length = u32::try_from(page_length)
        .ok()
        .filter(|len| (1..=MAX_PAGE_LENGTH).contains(len))
        .ok_or_else(|| {
            Error::invalid_header(format!(
                "page length {page_length} outside 1..={MAX_PAGE_LENGTH}"
            ))
        })?;
    let header_length = u32::try_from(header_length)
        .ok()
        .filter(|len| *len as usize >= prefix.len())
        .ok_or_else(|| {
            Error::invalid_header(format!(
                "header length {header_length} shorter than the {}-byte header prefix",
                prefix.len()
            ))
        })?;
    properties.header_length = header_length;
    properties.page_length = page_length;

    let page_count_offset = PAGE_COUNT_OFFSET + a1;
    let page_count = if alignment.u64 {
        fields.int_or_long(page_count_offset)?
    } else {
        i64::from(fields.i32(page_count_offset)?)
    };
    properties.page_count = u64::try_from(page_count).unwrap_or(0);

    let total = alignment.total();
    properties.sas_release =
        header_string(&fields, SAS_RELEASE_OFFSET + total, SAS_RELEASE_LENGTH, encoding)?;
    properties.server_type =
        header_string(&fields, SERVER_TYPE_OFFSET + total, OS_FIELD_LENGTH, encoding)?;
    properties.os_type =
        header_string(&fields, OS_VERSION_OFFSET + total, OS_FIELD_LENGTH, encoding)?;
    let os_name_offset = if fields.u8(OS_NAME_OFFSET + total)? == 0 {
        OS_MAKER_OFFSET + total
    } else {
        OS_NAME_OFFSET + total
    };
    properties.os_name = header_string(&fields, os_name_offset, OS_FIELD_LENGTH, encoding)?;

    skip_to_header_end(reader, u64::from(header_length) - prefix.len() as u64)?;

    Ok(SasHeader {
        properties,
        encoding,
    })
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let wanted = buf.len();
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::truncated_header(format!("expected {wanted} more header bytes"))
        } else {
            Error::Io(err)
        }
    })
}

fn skip_to_header_end<R: Read>(reader: &mut R, remaining: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(remaining), &mut io::sink())?;
    if skipped == remaining {
        Ok(())
    } else {
        Err(Error::truncated_header(format!(
            "expected to skip {remaining} bytes to the end of the header, skipped {skipped}"
        )))
    }
}

fn select_encoding(
    encoding_override: Option<&str>,
    file_encoding: Option<&'static str>,
) -> Result<&'static Encoding> {
    let label = encoding_override.or(file_encoding).ok_or_else(|| Error::UnsupportedEncoding {
        encoding: "<unknown character set code>".into(),
    })?;
    resolve_encoding(label).ok_or_else(|| Error::UnsupportedEncoding {
        encoding: label.to_owned().into(),
    })
}

fn header_string(
    fields: &FieldReader<'_>,
    offset: usize,
    len: usize,
    encoding: &'static Encoding,
) -> Result<String> {
    let raw = nul_terminated(fields.bytes(offset, len)?);
    let (decoded, _, _) = encoding.decode(raw);
    Ok(decoded.trim().to_owned())
}

fn header_timestamp(fields: &FieldReader<'_>, offset: usize) -> Result<Option<OffsetDateTime>> {
    let seconds = fields.f64(offset, BYTES_IN_DOUBLE)?;
    Ok(TemporalFormatter::format_seconds_as_timestamp(seconds))
}
