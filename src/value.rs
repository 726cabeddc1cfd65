use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// A single cell produced by the row materializer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null cell: NaN or near-zero numeric, blank text.
    Missing,
    /// Cells stored in two bytes or fewer.
    Int16(i16),
    /// Integral time-of-day seconds.
    Int64(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Text decoded from the file encoding, or a formatted temporal/percent value.
    Str(String),
    /// Raw trimmed bytes when byte output is requested.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(Date),
    /// Calendar date and wall-clock time without an offset.
    DateTime(PrimitiveDateTime),
    /// UTC instant truncated to milliseconds.
    Timestamp(OffsetDateTime),
}

impl Value {
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view over the integer and float variants.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int16(v) => Some(f64::from(*v)),
            #[allow(clippy::cast_precision_loss)]
            Self::Int64(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Float)
    }
}
