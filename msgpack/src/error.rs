//! Error types for MessagePack operations

use crate::tag::WireType;
use thiserror::Error;

/// Error type for encode, decode, transcode, and edit operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("short bytes: needed {needed}, remaining {remaining}")]
    ShortBytes { needed: usize, remaining: usize },
    #[error("type error: expected {expected}, found {actual}")]
    Type { expected: WireType, actual: WireType },
    #[error("overflow: {value} does not fit in i{bits}")]
    IntOverflow { value: i128, bits: u8 },
    #[error("overflow: {value} does not fit in u{bits}")]
    UintOverflow { value: u64, bits: u8 },
    #[error("unsigned read of negative value {0}")]
    UintBelowZero(i64),
    #[error("invalid prefix: 0x{0:02x}")]
    InvalidPrefix(u8),
    #[error("extension type mismatch: expected {expected}, found {actual}")]
    ExtensionMismatch { expected: i8, actual: i8 },
    #[error("invalid extension {code}: {len} byte payload")]
    InvalidExtension { code: i8, len: usize },
    #[error("extension code {0} is reserved")]
    ReservedExtension(i8),
    #[error("extension code {0} already registered")]
    DuplicateExtension(i8),
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("value is nil")]
    Nil,
    #[error("invalid utf-8")]
    InvalidUtf8,
    #[error("map key must be str or bin, found {0}")]
    InvalidMapKey(WireType),
    #[error("depth exceeded: {0}")]
    DepthExceeded(usize),
    #[error("extra data: {0} bytes")]
    ExtraData(usize),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the input ended before a complete value was read.
    ///
    /// A streaming caller may treat this as "wait for more data".
    pub fn is_short(&self) -> bool {
        matches!(self, Self::ShortBytes { .. })
    }

    /// Returns true if the value was present but encoded as nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns true if the error was caused by a value of the wrong wire type.
    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type { .. } | Self::Nil)
    }
}

/// Returns an error if `buf` does not hold at least `needed` bytes.
#[inline]
pub(crate) fn at_least(buf: &[u8], needed: usize) -> Result<(), Error> {
    if buf.len() < needed {
        return Err(Error::ShortBytes {
            needed,
            remaining: buf.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let short = Error::ShortBytes {
            needed: 2,
            remaining: 1,
        };
        assert!(short.is_short());
        assert!(!short.is_nil());
        assert!(Error::Nil.is_nil());
        assert!(Error::Nil.is_type());
        assert!(Error::Type {
            expected: WireType::Str,
            actual: WireType::Int,
        }
        .is_type());
    }

    #[test]
    fn test_display() {
        let err = Error::Type {
            expected: WireType::Map,
            actual: WireType::Array,
        };
        assert_eq!(err.to_string(), "type error: expected map, found array");
        let err = Error::IntOverflow {
            value: 300,
            bits: 8,
        };
        assert_eq!(err.to_string(), "overflow: 300 does not fit in i8");
    }
}
