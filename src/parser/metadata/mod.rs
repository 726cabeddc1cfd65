mod text_store;

#[cfg(test)]
mod tests;

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::{Error, Result, TextField, Warning};
use crate::logger::{log_debug, log_warn};
use crate::metadata::{Column, ColumnFormat, ColumnKind, Compression, FileProperties};
use crate::parser::byteorder::FieldReader;
use crate::parser::subheaders::{SubheaderKind, SubheaderPointer};

pub use text_store::{PendingText, PendingTextQueue, TextRef, TextStore};

// Row size subheader: int-or-long multipliers.
const ROW_LENGTH_MULTIPLIER: usize = 5;
const ROW_COUNT_MULTIPLIER: usize = 6;
const DELETED_ROW_COUNT_MULTIPLIER: usize = 8;
const MIX_PAGE_ROW_COUNT_MULTIPLIER: usize = 15;
// Row size subheader: 16-bit fields located past 82 int-or-long strides.
const ROW_SIZE_TEXT_STRIDES: usize = 82;
const FILE_LABEL_OFFSET_OFFSET: usize = 24;
const FILE_LABEL_LENGTH_OFFSET: usize = 26;
const COMPRESSION_METHOD_OFFSET_OFFSET: usize = 36;
const COMPRESSION_METHOD_LENGTH_OFFSET: usize = 38;

const COLUMN_NAME_POINTER_LENGTH: usize = 8;
const COLUMN_NAME_TEXT_INDEX_OFFSET: usize = 0;
const COLUMN_NAME_OFFSET_OFFSET: usize = 2;
const COLUMN_NAME_LENGTH_OFFSET: usize = 4;

const COLUMN_DATA_OFFSET_OFFSET: usize = 8;
const COLUMN_DATA_LENGTH_OFFSET: usize = 8;
const COLUMN_TYPE_OFFSET: usize = 14;

const FORMAT_WIDTH_OFFSET: usize = 0;
const FORMAT_PRECISION_OFFSET: usize = 2;
const FORMAT_TEXT_INDEX_OFFSET: usize = 22;
const FORMAT_OFFSET_OFFSET: usize = 24;
const FORMAT_LENGTH_OFFSET: usize = 26;
const LABEL_TEXT_INDEX_OFFSET: usize = 28;
const LABEL_OFFSET_OFFSET: usize = 30;
const LABEL_LENGTH_OFFSET: usize = 32;

/// Trailing bytes of column name and attribute subheaders that hold no entries.
const VECTOR_SUBHEADER_PADDING: usize = 12;

/// Where a column's bytes live inside a row, from the attributes subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSlot {
    pub offset: usize,
    pub length: usize,
    pub kind: ColumnKind,
}

/// Accumulates file properties and column descriptors from metadata subheaders.
///
/// Names, attributes and format/label subheaders arrive independently and are
/// joined positionally: the n-th format/label subheader builds the n-th column
/// from the n-th name and the n-th attribute entry.
#[derive(Debug)]
pub struct MetadataBuilder {
    properties: FileProperties,
    encoding: &'static Encoding,
    text: TextStore,
    pending: PendingTextQueue,
    names: Vec<String>,
    slots: Vec<ColumnSlot>,
    columns: Vec<Column>,
    file_label: TextRef,
    compression_method: TextRef,
}

impl MetadataBuilder {
    #[must_use]
    pub fn new(properties: FileProperties, encoding: &'static Encoding) -> Self {
        Self {
            properties,
            encoding,
            text: TextStore::new(),
            pending: PendingTextQueue::default(),
            names: Vec::new(),
            slots: Vec::new(),
            columns: Vec::new(),
            file_label: TextRef::new(0, 0, 0),
            compression_method: TextRef::new(0, 0, 0),
        }
    }

    #[must_use]
    pub const fn properties(&self) -> &FileProperties {
        &self.properties
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn slots(&self) -> &[ColumnSlot] {
        &self.slots
    }

    #[must_use]
    pub const fn text_store(&self) -> &TextStore {
        &self.text
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingTextQueue {
        &self.pending
    }

    /// Routes one metadata subheader to its processor. `Data` pointers are not
    /// metadata and are ignored here.
    ///
    /// # Errors
    ///
    /// Returns an error if a field of the subheader lies outside the page or
    /// a column is completed before its name or attributes were seen.
    pub fn process(
        &mut self,
        kind: SubheaderKind,
        fields: &FieldReader<'_>,
        pointer: &SubheaderPointer,
    ) -> Result<()> {
        match kind {
            SubheaderKind::RowSize => self.row_size(fields, pointer.offset),
            SubheaderKind::ColumnSize => self.column_size(fields, pointer.offset),
            SubheaderKind::ColumnText => self.column_text(fields, pointer.offset),
            SubheaderKind::ColumnName => self.column_name(fields, pointer),
            SubheaderKind::ColumnAttributes => self.column_attributes(fields, pointer),
            SubheaderKind::FormatAndLabel => self.format_and_label(fields, pointer.offset),
            SubheaderKind::SubheaderCounts | SubheaderKind::ColumnList | SubheaderKind::Data => {
                Ok(())
            }
        }
    }

    fn row_size(&mut self, fields: &FieldReader<'_>, offset: usize) -> Result<()> {
        let width = fields.int_or_long_size();
        let count = |multiplier: usize| -> Result<u64> {
            let value = fields.int_or_long(offset + multiplier * width)?;
            Ok(u64::try_from(value).unwrap_or(0))
        };

        let props = &mut self.properties;
        if props.row_length == 0 {
            props.row_length = count(ROW_LENGTH_MULTIPLIER)?;
        }
        if props.row_count == 0 {
            props.row_count = count(ROW_COUNT_MULTIPLIER)?;
        }
        if props.mix_page_row_count == 0 {
            props.mix_page_row_count = count(MIX_PAGE_ROW_COUNT_MULTIPLIER)?;
        }
        if props.deleted_row_count == 0 {
            props.deleted_row_count = count(DELETED_ROW_COUNT_MULTIPLIER)?;
        }

        let text_base = offset + ROW_SIZE_TEXT_STRIDES * width;
        self.file_label = TextRef::new(
            0,
            fields.u16_field(text_base + FILE_LABEL_OFFSET_OFFSET)?,
            fields.u16_field(text_base + FILE_LABEL_LENGTH_OFFSET)?,
        );
        self.compression_method = TextRef::new(
            0,
            fields.u16_field(text_base + COMPRESSION_METHOD_OFFSET_OFFSET)?,
            fields.u16_field(text_base + COMPRESSION_METHOD_LENGTH_OFFSET)?,
        );
        Ok(())
    }

    fn column_size(&mut self, fields: &FieldReader<'_>, offset: usize) -> Result<()> {
        let count = fields.int_or_long(offset + fields.int_or_long_size())?;
        self.properties.column_count = u64::try_from(count).unwrap_or(0);
        Ok(())
    }

    fn column_text(&mut self, fields: &FieldReader<'_>, offset: usize) -> Result<()> {
        let start = offset + fields.int_or_long_size();
        let size = usize::from(fields.u16(start)?);
        self.text.push_block(fields.bytes(start, size)?);

        if self.text.len() == 1 {
            self.resolve_file_strings();
        }
        Ok(())
    }

    /// Compression literal and file label both live in the first text block.
    fn resolve_file_strings(&mut self) {
        let literal = self
            .text
            .resolve(self.compression_method, self.encoding)
            .ok()
            .flatten();
        if let Some(compression) = literal.as_deref().and_then(Compression::from_literal) {
            log_debug(&format!(
                "compression method {} detected",
                literal.as_deref().unwrap_or_default()
            ));
            self.properties.compression = compression;
        }
        if let Ok(Some(label)) = self.text.resolve(self.file_label, self.encoding) {
            self.properties.file_label = label;
        }
    }

    fn column_name(&mut self, fields: &FieldReader<'_>, pointer: &SubheaderPointer) -> Result<()> {
        let width = fields.int_or_long_size();
        let entries =
            pointer.length.saturating_sub(2 * width + VECTOR_SUBHEADER_PADDING) / COLUMN_NAME_POINTER_LENGTH;

        for i in 0..entries {
            let base = pointer.offset + width + COLUMN_NAME_POINTER_LENGTH * (i + 1);
            let text = TextRef::new(
                fields.u16_field(base + COLUMN_NAME_TEXT_INDEX_OFFSET)?,
                fields.u16_field(base + COLUMN_NAME_OFFSET_OFFSET)?,
                fields.u16_field(base + COLUMN_NAME_LENGTH_OFFSET)?,
            );
            let column = self.names.len();
            let name = self.resolve_or_defer(column, TextField::Name, text)?;
            self.names.push(name.unwrap_or_default());
        }
        Ok(())
    }

    fn column_attributes(
        &mut self,
        fields: &FieldReader<'_>,
        pointer: &SubheaderPointer,
    ) -> Result<()> {
        let width = fields.int_or_long_size();
        let stride = width + 8;
        let entries = pointer.length.saturating_sub(2 * width + VECTOR_SUBHEADER_PADDING) / stride;

        for i in 0..entries {
            let entry = pointer.offset + i * stride;
            let data_offset = fields.usize_field(entry + width + COLUMN_DATA_OFFSET_OFFSET)?;
            let data_length = fields.i32(entry + 2 * width + COLUMN_DATA_LENGTH_OFFSET)?;
            let type_code = fields.u8(entry + 2 * width + COLUMN_TYPE_OFFSET)?;
            self.slots.push(ColumnSlot {
                offset: data_offset,
                length: usize::try_from(data_length).unwrap_or(0),
                kind: ColumnKind::from_type_code(type_code),
            });
        }
        Ok(())
    }

    fn format_and_label(&mut self, fields: &FieldReader<'_>, offset: usize) -> Result<()> {
        let base = offset + 3 * fields.int_or_long_size();
        let format_width = fields.u16_field(base + FORMAT_WIDTH_OFFSET)?;
        let format_precision = fields.u16_field(base + FORMAT_PRECISION_OFFSET)?;
        let format_ref = TextRef::new(
            fields.u16_field(base + FORMAT_TEXT_INDEX_OFFSET)?,
            fields.u16_field(base + FORMAT_OFFSET_OFFSET)?,
            fields.u16_field(base + FORMAT_LENGTH_OFFSET)?,
        );
        let label_ref = TextRef::new(
            fields.u16_field(base + LABEL_TEXT_INDEX_OFFSET)?,
            fields.u16_field(base + LABEL_OFFSET_OFFSET)?,
            fields.u16_field(base + LABEL_LENGTH_OFFSET)?,
        );

        let index = self.columns.len();
        let label = self.resolve_or_defer(index, TextField::Label, label_ref)?;
        let format_name = self.resolve_or_defer(index, TextField::Format, format_ref)?;

        let slot = self.slots.get(index).copied().ok_or_else(|| Error::Corrupted {
            section: fields.section(),
            details: Cow::from(format!(
                "format subheader for column {index} precedes its attributes"
            )),
        })?;
        let name = self.names.get(index).cloned().unwrap_or_default();

        #[allow(clippy::cast_possible_truncation)]
        self.columns.push(Column {
            id: (index + 1) as u32,
            name,
            label: label.unwrap_or_default(),
            format: ColumnFormat::new(
                format_name.unwrap_or_default(),
                format_width as u32,
                format_precision as u32,
            ),
            kind: slot.kind,
            length: slot.length as u32,
        });
        Ok(())
    }

    fn resolve_or_defer(
        &mut self,
        column: usize,
        field: TextField,
        text: TextRef,
    ) -> Result<Option<String>> {
        if self.text.contains(text) {
            self.text.resolve(text, self.encoding)
        } else {
            self.pending.push(column, field, text);
            Ok(None)
        }
    }

    /// Back-fills queued forward references whose text blocks have arrived.
    /// Returns the number of fields that were filled in.
    ///
    /// # Errors
    ///
    /// Returns an error if a queued reference exceeds its text block.
    pub fn resolve_pending(&mut self) -> Result<usize> {
        let ready = self.pending.drain_resolvable(&self.text);
        let resolved = ready.len();
        for entry in ready {
            let text = self
                .text
                .resolve(entry.text, self.encoding)?
                .unwrap_or_default();
            match entry.field {
                TextField::Name => {
                    if let Some(name) = self.names.get_mut(entry.column) {
                        name.clone_from(&text);
                    }
                    if let Some(column) = self.columns.get_mut(entry.column) {
                        column.name = text;
                    }
                }
                TextField::Label => {
                    if let Some(column) = self.columns.get_mut(entry.column) {
                        column.label = text;
                    }
                }
                TextField::Format => {
                    if let Some(column) = self.columns.get_mut(entry.column) {
                        column.format.name = text;
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// Forward references still waiting for their text block.
    #[must_use]
    pub fn unresolved_warnings(&self) -> Vec<Warning> {
        self.pending
            .entries()
            .iter()
            .map(|entry| Warning::UnresolvedTextReference {
                column: entry.column,
                field: entry.field,
                text_block: entry.text.index,
            })
            .collect()
    }

    /// Logs every forward reference left unresolved once metadata is complete.
    pub fn report_unresolved(&self) {
        for warning in self.unresolved_warnings() {
            log_warn(&warning.to_string());
        }
    }
}
