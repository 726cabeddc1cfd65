use std::borrow::Cow;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result, Section};
use crate::metadata::Endianness;

pub const BYTES_IN_INT: usize = 4;
pub const BYTES_IN_LONG: usize = 8;
pub const BYTES_IN_DOUBLE: usize = 8;

/// Reads an `i16` from the first two bytes of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` has fewer than two elements.
#[inline]
#[must_use]
pub fn read_i16(endian: Endianness, bytes: &[u8]) -> i16 {
    match endian {
        Endianness::Little => LittleEndian::read_i16(bytes),
        Endianness::Big => BigEndian::read_i16(bytes),
    }
}

/// Reads a `u16` from the first two bytes of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` has fewer than two elements.
#[inline]
#[must_use]
pub fn read_u16(endian: Endianness, bytes: &[u8]) -> u16 {
    match endian {
        Endianness::Little => LittleEndian::read_u16(bytes),
        Endianness::Big => BigEndian::read_u16(bytes),
    }
}

/// Reads an `i32` from the first four bytes of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` has fewer than four elements.
#[inline]
#[must_use]
pub fn read_i32(endian: Endianness, bytes: &[u8]) -> i32 {
    match endian {
        Endianness::Little => LittleEndian::read_i32(bytes),
        Endianness::Big => BigEndian::read_i32(bytes),
    }
}

/// Reads an `i64` from the first eight bytes of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` has fewer than eight elements.
#[inline]
#[must_use]
pub fn read_i64(endian: Endianness, bytes: &[u8]) -> i64 {
    match endian {
        Endianness::Little => LittleEndian::read_i64(bytes),
        Endianness::Big => BigEndian::read_i64(bytes),
    }
}

/// Interprets up to eight bytes as an IEEE-754 double.
///
/// Shorter spans are truncated doubles: the stored bytes are the most
/// significant ones, so the missing low-order bytes are zero-filled.
#[inline]
#[must_use]
pub fn read_f64_padded(endian: Endianness, bytes: &[u8]) -> f64 {
    let len = bytes.len().min(BYTES_IN_DOUBLE);
    let mut buf = [0u8; BYTES_IN_DOUBLE];
    match endian {
        Endianness::Big => {
            buf[..len].copy_from_slice(&bytes[..len]);
            BigEndian::read_f64(&buf)
        }
        Endianness::Little => {
            buf[BYTES_IN_DOUBLE - len..].copy_from_slice(&bytes[..len]);
            LittleEndian::read_f64(&buf)
        }
    }
}

/// Bounds-checked field access over a buffered page (or header prefix).
///
/// Integer width follows the resolved bitness: "int-or-long" fields are four
/// bytes wide in 32-bit files and eight bytes wide in 64-bit files.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    endianness: Endianness,
    u64: bool,
    section: Section,
}

impl<'a> FieldReader<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8], endianness: Endianness, u64: bool, section: Section) -> Self {
        Self {
            data,
            endianness,
            u64,
            section,
        }
    }

    #[must_use]
    pub const fn with_section(self, section: Section) -> Self {
        Self { section, ..self }
    }

    #[must_use]
    pub const fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        self.endianness
    }

    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub const fn int_or_long_size(&self) -> usize {
        if self.u64 { BYTES_IN_LONG } else { BYTES_IN_INT }
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the range leaves the buffer.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| Error::Corrupted {
                section: self.section,
                details: Cow::from(format!(
                    "field at offset {offset} with length {len} exceeds buffer of {} bytes",
                    self.data.len()
                )),
            })
    }

    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when `offset` is out of bounds.
    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.bytes(offset, 1)?[0])
    }

    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the field is out of bounds.
    pub fn i16(&self, offset: usize) -> Result<i16> {
        Ok(read_i16(self.endianness, self.bytes(offset, 2)?))
    }

    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the field is out of bounds.
    pub fn u16(&self, offset: usize) -> Result<u16> {
        Ok(read_u16(self.endianness, self.bytes(offset, 2)?))
    }

    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the field is out of bounds.
    pub fn i32(&self, offset: usize) -> Result<i32> {
        Ok(read_i32(self.endianness, self.bytes(offset, BYTES_IN_INT)?))
    }

    /// Reads a bitness-dependent integer, sign-extending 32-bit values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the field is out of bounds.
    pub fn int_or_long(&self, offset: usize) -> Result<i64> {
        if self.u64 {
            Ok(read_i64(self.endianness, self.bytes(offset, BYTES_IN_LONG)?))
        } else {
            self.i32(offset).map(i64::from)
        }
    }

    /// Reads an int-or-long field that must describe a size or offset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] for negative values or out-of-bounds fields.
    pub fn usize_field(&self, offset: usize) -> Result<usize> {
        let value = self.int_or_long(offset)?;
        usize::try_from(value).map_err(|_| Error::Corrupted {
            section: self.section,
            details: Cow::from(format!("negative size {value} at offset {offset}")),
        })
    }

    /// Reads a 16-bit field that must be non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] for negative values or out-of-bounds fields.
    pub fn u16_field(&self, offset: usize) -> Result<usize> {
        let value = self.i16(offset)?;
        usize::try_from(value).map_err(|_| Error::Corrupted {
            section: self.section,
            details: Cow::from(format!("negative 16-bit field {value} at offset {offset}")),
        })
    }

    /// Reads a subheader signature as a sign-extended 64-bit key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the field is out of bounds.
    #[allow(clippy::cast_sign_loss)]
    pub fn signature(&self, offset: usize) -> Result<u64> {
        self.int_or_long(offset).map(|value| value as u64)
    }

    /// # Errors
    ///
    /// Returns [`Error::Corrupted`] when the field is out of bounds.
    pub fn f64(&self, offset: usize, len: usize) -> Result<f64> {
        Ok(read_f64_padded(self.endianness, self.bytes(offset, len)?))
    }
}
