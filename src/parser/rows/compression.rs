use std::borrow::Cow;

use crate::error::{Error, Result, Section};
use crate::metadata::Compression;

/// Row decompression strategy selected by the file's compression literal.
pub trait Decompressor {
    /// Expands `input` into `output`, which is resized to exactly `row_length` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] if the stream is malformed or does not
    /// produce exactly `row_length` bytes.
    fn decompress(
        &self,
        input: &[u8],
        row_length: usize,
        output: &mut Vec<u8>,
        page_index: u64,
    ) -> Result<()>;
}

/// `SASYZCRL` run-length scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct RleDecompressor;

/// `SASYZCR2` Ross data compression scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdcDecompressor;

/// Returns the strategy for `compression`, `None` when rows are stored verbatim.
#[must_use]
pub fn decompressor_for(compression: Compression) -> Option<&'static dyn Decompressor> {
    match compression {
        Compression::None => None,
        Compression::Row => Some(&RleDecompressor),
        Compression::Binary => Some(&RdcDecompressor),
    }
}

/// Write cursor over a fixed-size row buffer.
struct RowWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> RowWriter<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    const fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    fn literal(&mut self, bytes: &[u8]) -> std::result::Result<(), &'static str> {
        if bytes.len() > self.remaining() {
            return Err("literal run exceeds row length");
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }

    fn fill(&mut self, byte: u8, count: usize) -> std::result::Result<(), &'static str> {
        if count > self.remaining() {
            return Err("fill run exceeds row length");
        }
        self.buffer[self.position..self.position + count].fill(byte);
        self.position += count;
        Ok(())
    }

    /// Copies `count` bytes that were written `distance` bytes ago.
    fn back_reference(
        &mut self,
        distance: usize,
        count: usize,
    ) -> std::result::Result<(), &'static str> {
        if distance == 0 || distance > self.position {
            return Err("back reference before start of row");
        }
        if count > self.remaining() {
            return Err("back reference exceeds row length");
        }
        let start = self.position - distance;
        self.buffer.copy_within(start..start + count, self.position);
        self.position += count;
        Ok(())
    }

    const fn is_full(&self) -> bool {
        self.position == self.buffer.len()
    }
}

/// Reader over the compressed input.
struct Input<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Input<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    const fn has_more(&self) -> bool {
        self.position < self.bytes.len()
    }

    fn byte(&mut self) -> std::result::Result<u8, &'static str> {
        let value = *self
            .bytes
            .get(self.position)
            .ok_or("control sequence runs past end of input")?;
        self.position += 1;
        Ok(value)
    }

    fn take(&mut self, count: usize) -> std::result::Result<&'a [u8], &'static str> {
        let slice = self
            .bytes
            .get(self.position..self.position + count)
            .ok_or("literal run exceeds input")?;
        self.position += count;
        Ok(slice)
    }
}

fn run_to_completion(
    input: &[u8],
    row_length: usize,
    output: &mut Vec<u8>,
    page_index: u64,
    step: impl Fn(&mut Input<'_>, &mut RowWriter<'_>) -> std::result::Result<(), &'static str>,
) -> Result<()> {
    output.clear();
    output.resize(row_length, 0);
    let mut source = Input::new(input);
    let mut writer = RowWriter::new(output.as_mut_slice());

    let outcome = (|| {
        while source.has_more() && !writer.is_full() {
            step(&mut source, &mut writer)?;
        }
        if writer.is_full() {
            Ok(())
        } else {
            Err("decompressed row shorter than row length")
        }
    })();

    outcome.map_err(|reason| Error::Corrupted {
        section: Section::Decompression { page_index },
        details: Cow::from(reason),
    })
}

impl RleDecompressor {
    fn step(
        input: &mut Input<'_>,
        out: &mut RowWriter<'_>,
    ) -> std::result::Result<(), &'static str> {
        let control = input.byte()?;
        let nibble = usize::from(control & 0x0F);
        match control >> 4 {
            0x0 => {
                let count = usize::from(input.byte()?) + 64 + nibble * 256;
                out.literal(input.take(count)?)
            }
            0x1 => {
                let count = usize::from(input.byte()?) + 64 + nibble * 256 + 4096;
                out.literal(input.take(count)?)
            }
            0x2 => out.literal(input.take(nibble + 96)?),
            0x4 => {
                let count = usize::from(input.byte()?) + 18 + nibble * 256;
                let byte = input.byte()?;
                out.fill(byte, count)
            }
            0x5 => {
                let count = usize::from(input.byte()?) + 17 + nibble * 256;
                out.fill(b'@', count)
            }
            0x6 => {
                let count = usize::from(input.byte()?) + 17 + nibble * 256;
                out.fill(b' ', count)
            }
            0x7 => {
                let count = usize::from(input.byte()?) + 17 + nibble * 256;
                out.fill(0, count)
            }
            0x8 => out.literal(input.take(nibble + 1)?),
            0x9 => out.literal(input.take(nibble + 17)?),
            0xA => out.literal(input.take(nibble + 33)?),
            0xB => out.literal(input.take(nibble + 49)?),
            0xC => {
                let byte = input.byte()?;
                out.fill(byte, nibble + 3)
            }
            0xD => out.fill(b'@', nibble + 2),
            0xE => out.fill(b' ', nibble + 2),
            0xF => out.fill(0, nibble + 2),
            // Command 3 carries no payload.
            _ => Ok(()),
        }
    }
}

impl Decompressor for RleDecompressor {
    fn decompress(
        &self,
        input: &[u8],
        row_length: usize,
        output: &mut Vec<u8>,
        page_index: u64,
    ) -> Result<()> {
        run_to_completion(input, row_length, output, page_index, Self::step)
    }
}

impl RdcDecompressor {
    /// One control word followed by up to sixteen items; a set bit marks a
    /// command item, a clear bit a literal byte.
    fn step(
        input: &mut Input<'_>,
        out: &mut RowWriter<'_>,
    ) -> std::result::Result<(), &'static str> {
        let control = u16::from_be_bytes([input.byte()?, input.byte()?]);
        for bit in 0..16 {
            if !input.has_more() || out.is_full() {
                break;
            }
            if control & (0x8000 >> bit) == 0 {
                let byte = input.byte()?;
                out.literal(&[byte])?;
                continue;
            }

            let marker = input.byte()?;
            let next = input.byte()?;
            let low = usize::from(marker & 0x0F);
            let high = usize::from(next) * 16;
            match marker >> 4 {
                0 => out.fill(next, low + 3)?,
                1 => {
                    let byte = input.byte()?;
                    out.fill(byte, 19 + low + high)?;
                }
                2 => {
                    let count = usize::from(input.byte()?) + 16;
                    out.back_reference(3 + low + high, count)?;
                }
                count => out.back_reference(3 + low + high, usize::from(count))?,
            }
        }
        Ok(())
    }
}

impl Decompressor for RdcDecompressor {
    fn decompress(
        &self,
        input: &[u8],
        row_length: usize,
        output: &mut Vec<u8>,
        page_index: u64,
    ) -> Result<()> {
        run_to_completion(input, row_length, output, page_index, Self::step)
    }
}
