use std::borrow::Cow;
use std::io::{self, Read};

pub mod compression;
mod decode;


use smallvec::SmallVec;

use crate::error::{Error, Result, Section, Warning};
use crate::logger::{log_debug, log_warn};
use crate::metadata::{Column, Endianness, FileProperties};
use crate::parser::byteorder::FieldReader;
use crate::parser::header::SasHeader;
use crate::parser::metadata::MetadataBuilder;
use crate::parser::page::{DeletedRowBitmap, PageHeader, PageKind, PageLayout, PageType};
use crate::parser::subheaders::{SubheaderKind, SubheaderPointer, classify};
use crate::value::Value;
use compression::{Decompressor, decompressor_for};

pub use decode::{CellDecoder, CellOptions, PercentPattern, decode_string};

/// Where the bytes of the next row live on the buffered page.
#[derive(Debug, Clone, Copy)]
struct RowSpan {
    start: usize,
    length: usize,
}

/// Single-pass decoding state for one file: the stream cursor, the buffered
/// page and everything derived from the pages read so far.
///
/// Construction runs the metadata phase; afterwards [`RowSession::read_next`]
/// walks the remaining pages row by row. The session is not reentrant.
pub struct RowSession<R: Read> {
    reader: R,
    layout: PageLayout,
    endianness: Endianness,
    page_buffer: Vec<u8>,
    next_page_index: u64,
    page_index: u64,
    page_type: Option<PageType>,
    page_header: PageHeader,
    deleted: DeletedRowBitmap,
    data_pointers: SmallVec<[SubheaderPointer; 16]>,
    row_on_page: usize,
    metadata: MetadataBuilder,
    cells: CellDecoder,
    decompressor: Option<&'static dyn Decompressor>,
    row_buffer: Vec<u8>,
    row_length: usize,
    rows_read: u64,
    eof: bool,
    unresolved_reported: bool,
    warnings: Vec<Warning>,
}

impl<R: Read> RowSession<R> {
    /// Reads metadata pages until the first page that carries rows.
    ///
    /// `reader` must be positioned right after the file header.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata subheader is malformed or the stream
    /// fails for a reason other than ending early.
    pub fn new(reader: R, header: SasHeader, options: CellOptions) -> Result<Self> {
        let SasHeader {
            properties,
            encoding,
        } = header;
        let layout = PageLayout::new(properties.u64);
        let endianness = properties.endianness;
        let page_length = properties.page_length as usize;

        let mut session = Self {
            reader,
            layout,
            endianness,
            page_buffer: vec![0u8; page_length],
            next_page_index: 0,
            page_index: 0,
            page_type: None,
            page_header: PageHeader {
                type_code: 0,
                block_count: 0,
                subheader_count: 0,
            },
            deleted: DeletedRowBitmap::empty(),
            data_pointers: SmallVec::new(),
            row_on_page: 0,
            metadata: MetadataBuilder::new(properties, encoding),
            cells: CellDecoder::new(encoding, endianness, options),
            decompressor: None,
            row_buffer: Vec::new(),
            row_length: 0,
            rows_read: 0,
            eof: false,
            unresolved_reported: false,
            warnings: Vec::new(),
        };
        session.read_metadata()?;
        Ok(session)
    }

    fn read_metadata(&mut self) -> Result<()> {
        while self.load_page()? {
            let rows_follow = matches!(
                self.page_type.map(|page| page.kind),
                Some(PageKind::Data | PageKind::Mix)
            );
            if rows_follow || !self.data_pointers.is_empty() {
                break;
            }
        }

        let properties = self.metadata.properties();
        self.row_length = usize::try_from(properties.row_length).map_err(|_| Error::Corrupted {
            section: Section::Header,
            details: Cow::from(format!(
                "row length {} exceeds platform pointer width",
                properties.row_length
            )),
        })?;
        self.decompressor = decompressor_for(properties.compression);
        log_debug(&format!(
            "metadata read: {} columns from {} text blocks, row length {}",
            self.metadata.columns().len(),
            self.metadata.text_store().len(),
            self.row_length
        ));
        if !self.metadata.pending().is_empty() {
            log_debug(&format!(
                "{} column text references wait for a later page",
                self.metadata.pending().entries().len()
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn properties(&self) -> &FileProperties {
        self.metadata.properties()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.metadata.columns()
    }

    /// Number of rows returned so far.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.rows_read
    }

    #[must_use]
    pub const fn cell_options(&self) -> CellOptions {
        self.cells.options()
    }

    /// Recorded warnings followed by column text references still unresolved.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = self.warnings.clone();
        warnings.extend(self.metadata.unresolved_warnings());
        warnings
    }

    /// Reads the next live row.
    ///
    /// With a projection, only the listed column indices are converted and
    /// the row holds them in projection order. Returns `Ok(None)` once the
    /// declared row count is reached or the stream ends.
    ///
    /// # Errors
    ///
    /// Returns an error if a row or cell lies outside the page or a
    /// compressed row cannot be expanded.
    pub fn read_next(&mut self, projection: Option<&[usize]>) -> Result<Option<Vec<Value>>> {
        loop {
            if self.eof || self.rows_read >= self.metadata.properties().row_count {
                self.report_unresolved_once();
                return Ok(None);
            }

            let Some(page_type) = self.page_type else {
                self.load_page()?;
                continue;
            };
            let Some((slot, span)) = self.next_span(page_type) else {
                self.load_page()?;
                continue;
            };

            if page_type.has_deletions && self.deleted.is_deleted(slot) {
                log_debug(&format!(
                    "skipping deleted row slot {slot} on page {}",
                    self.page_index
                ));
                continue;
            }

            let row = self.materialize(span, projection)?;
            self.rows_read += 1;
            return Ok(Some(row));
        }
    }

    /// Claims the next row slot of the current page, `None` when the page is
    /// used up.
    fn next_span(&mut self, page_type: PageType) -> Option<(usize, RowSpan)> {
        let slot = self.row_on_page;
        let row_length = self.row_length;
        let span = match page_type.kind {
            PageKind::Meta => {
                let pointer = self.data_pointers.get(slot)?;
                RowSpan {
                    start: pointer.offset,
                    length: pointer.length,
                }
            }
            PageKind::Mix => {
                let start = self.layout.mix_rows_offset(self.page_header.subheader_count);
                let properties = self.metadata.properties();
                // Deleted slots sit among the live ones, so they count towards the cap.
                let slots = properties
                    .row_count
                    .saturating_add(properties.deleted_row_count)
                    .min(properties.mix_page_row_count);
                let cap = usize::try_from(slots)
                    .unwrap_or(usize::MAX)
                    .min(self.slots_that_fit(start));
                if slot >= cap {
                    return None;
                }
                RowSpan {
                    start: start + slot * row_length,
                    length: row_length,
                }
            }
            PageKind::Data => {
                let start = self.layout.data_rows_offset();
                let cap = self.page_header.block_count.min(self.slots_that_fit(start));
                if slot >= cap {
                    return None;
                }
                RowSpan {
                    start: start + slot * row_length,
                    length: row_length,
                }
            }
            PageKind::Amd => return None,
        };
        self.row_on_page += 1;
        Some((slot, span))
    }

    fn slots_that_fit(&self, start: usize) -> usize {
        if self.row_length == 0 {
            return 0;
        }
        self.page_buffer.len().saturating_sub(start) / self.row_length
    }

    fn materialize(&mut self, span: RowSpan, projection: Option<&[usize]>) -> Result<Vec<Value>> {
        let row_index = self.rows_read;
        let row_length = self.row_length;
        let out_of_page = || Error::Corrupted {
            section: Section::Row { index: row_index },
            details: Cow::from(format!(
                "row at offset {} with length {} exceeds page {}",
                span.start, span.length, self.page_index
            )),
        };

        let row: &[u8] = match self.decompressor {
            Some(decompressor) if span.length < row_length => {
                let compressed = span
                    .start
                    .checked_add(span.length)
                    .and_then(|end| self.page_buffer.get(span.start..end))
                    .ok_or_else(out_of_page)?;
                decompressor.decompress(
                    compressed,
                    row_length,
                    &mut self.row_buffer,
                    self.page_index,
                )?;
                &self.row_buffer
            }
            _ => span
                .start
                .checked_add(row_length)
                .and_then(|end| self.page_buffer.get(span.start..end))
                .ok_or_else(out_of_page)?,
        };

        let columns = self.metadata.columns();
        let slots = self.metadata.slots();
        // A zero-length column ends the real columns of the row.
        let live = columns
            .iter()
            .position(|column| column.length == 0)
            .unwrap_or(columns.len());

        let mut decode = |index: usize| -> Result<Value> {
            if index >= live {
                return Ok(Value::Missing);
            }
            let (Some(column), Some(slot)) = (columns.get(index), slots.get(index)) else {
                return Ok(Value::Missing);
            };
            let cell = slot
                .offset
                .checked_add(slot.length)
                .and_then(|end| row.get(slot.offset..end))
                .ok_or_else(|| Error::Corrupted {
                    section: Section::Column {
                        index: column.id,
                    },
                    details: Cow::from(format!(
                        "cell at offset {} with length {} exceeds row length {}",
                        slot.offset,
                        slot.length,
                        row.len()
                    )),
                })?;
            Ok(self.cells.decode(column, cell))
        };

        match projection {
            Some(indices) => indices.iter().map(|&index| decode(index)).collect(),
            None => (0..columns.len()).map(decode).collect(),
        }
    }

    /// Buffers the next page and processes its header, subheaders, deleted-row
    /// bitmap and pending text references. Returns `false` at end of stream.
    fn load_page(&mut self) -> Result<bool> {
        self.page_type = None;
        self.data_pointers.clear();
        self.row_on_page = 0;
        self.deleted = DeletedRowBitmap::empty();
        if self.eof {
            return Ok(false);
        }

        let bytes_read = fill_buffer(&mut self.reader, &mut self.page_buffer)?;
        self.page_index = self.next_page_index;
        if bytes_read < self.page_buffer.len() {
            self.eof = true;
            if bytes_read > 0 {
                let warning = Warning::TruncatedPage {
                    page_index: self.page_index,
                    bytes_read,
                };
                log_warn(&warning.to_string());
                self.warnings.push(warning);
            }
            return Ok(false);
        }
        self.next_page_index += 1;
        self.process_page()?;
        Ok(true)
    }

    fn process_page(&mut self) -> Result<()> {
        let page_index = self.page_index;
        let fields = FieldReader::new(
            &self.page_buffer,
            self.endianness,
            self.layout.u64,
            Section::Page { index: page_index },
        );
        let header = PageHeader::read(&fields, self.layout)?;
        self.page_header = header;
        let Some(page_type) = header.page_type() else {
            log_debug(&format!(
                "skipping page {page_index} with unknown type code {}",
                header.type_code
            ));
            return Ok(());
        };
        self.page_type = Some(page_type);

        if page_type.carries_subheaders() {
            for index in 0..header.subheader_count {
                let pointer = SubheaderPointer::read(&fields, self.layout, index)?;
                if pointer.is_truncated() {
                    continue;
                }
                let signature = fields.signature(pointer.offset)?;
                let compressed = self.metadata.properties().is_compressed();
                match classify(signature, &pointer, compressed) {
                    Some(SubheaderKind::Data) => self.data_pointers.push(pointer),
                    Some(kind) => {
                        let section = Section::subheader(page_index, signature);
                        self.metadata
                            .process(kind, &fields.with_section(section), &pointer)?;
                    }
                    None => {
                        let warning = Warning::UnknownSubheaderSignature {
                            page_index,
                            signature,
                        };
                        log_debug(&warning.to_string());
                        self.warnings.push(warning);
                    }
                }
            }
        }

        if page_type.has_deletions {
            let row_length = usize::try_from(self.metadata.properties().row_length).unwrap_or(0);
            self.deleted = DeletedRowBitmap::read(&fields, self.layout, &header, row_length)?;
            log_debug(&format!(
                "page {page_index} marks {} row slots deleted",
                self.deleted.deleted_count()
            ));
        }

        if page_type.kind == PageKind::Amd {
            let resolved = self.metadata.resolve_pending()?;
            log_debug(&format!(
                "page {page_index} back-filled {resolved} column text references"
            ));
        }
        Ok(())
    }

    fn report_unresolved_once(&mut self) {
        if !self.unresolved_reported {
            self.unresolved_reported = true;
            self.metadata.report_unresolved();
        }
    }
}

impl<R: Read> std::fmt::Debug for RowSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowSession")
            .field("page_index", &self.page_index)
            .field("page_type", &self.page_type)
            .field("rows_read", &self.rows_read)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

/// Reads until `buf` is full or the stream ends; returns the bytes read.
fn fill_buffer<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(Error::Io(err)),
        }
    }
    Ok(filled)
}
