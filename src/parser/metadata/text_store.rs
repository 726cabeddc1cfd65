use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::{Error, Result, Section, TextField};

/// Reference into a column text block: block index plus a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRef {
    pub index: usize,
    pub offset: usize,
    pub length: usize,
}

impl TextRef {
    #[must_use]
    pub const fn new(index: usize, offset: usize, length: usize) -> Self {
        Self {
            index,
            offset,
            length,
        }
    }
}

/// Text blocks in discovery order, as copied out of column text subheaders.
///
/// Each block keeps its two-byte size prefix; references index from there.
#[derive(Debug, Default)]
pub struct TextStore {
    blocks: Vec<Vec<u8>>,
}

impl TextStore {
    #[must_use]
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn push_block(&mut self, block: &[u8]) {
        self.blocks.push(block.to_vec());
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn contains(&self, text_ref: TextRef) -> bool {
        text_ref.index < self.blocks.len()
    }

    /// Raw bytes for `text_ref`, `None` when the block has not been read yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte range exceeds the referenced block.
    pub fn bytes(&self, text_ref: TextRef) -> Result<Option<&[u8]>> {
        let Some(block) = self.blocks.get(text_ref.index) else {
            return Ok(None);
        };
        let end = text_ref.offset + text_ref.length;
        block
            .get(text_ref.offset..end)
            .map(Some)
            .ok_or_else(|| Error::Corrupted {
                section: Section::Header,
                details: Cow::from(format!(
                    "text reference {}..{end} exceeds block {} of {} bytes",
                    text_ref.offset,
                    text_ref.index,
                    block.len()
                )),
            })
    }

    /// Decodes `text_ref` with the file encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte range exceeds the referenced block.
    pub fn resolve(&self, text_ref: TextRef, encoding: &'static Encoding) -> Result<Option<String>> {
        Ok(self.bytes(text_ref)?.map(|raw| {
            let (decoded, _, _) = encoding.decode(raw);
            decoded.into_owned()
        }))
    }
}

/// Column field whose text block had not been read when the column was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingText {
    pub column: usize,
    pub field: TextField,
    pub text: TextRef,
}

/// Forward references waiting for an AMD page to supply their text blocks.
#[derive(Debug, Default)]
pub struct PendingTextQueue {
    entries: Vec<PendingText>,
}

impl PendingTextQueue {
    pub fn push(&mut self, column: usize, field: TextField, text: TextRef) {
        self.entries.push(PendingText {
            column,
            field,
            text,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[PendingText] {
        &self.entries
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns every entry whose block is now present, keeping the rest queued.
    pub fn drain_resolvable(&mut self, store: &TextStore) -> Vec<PendingText> {
        let (ready, waiting): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| store.contains(entry.text));
        self.entries = waiting;
        ready
    }
}
