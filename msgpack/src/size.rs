//! Skip and size traversal over encoded values.
//!
//! Everything that needs the byte span of a value without decoding it (skipping in the stream
//! [crate::Reader], skipping in a byte span, computing the total encoded length, locating a field)
//! is built from [size_of], so wire-format knowledge about lengths lives in one place.
//!
//! The module also exposes upper-bound size estimates for every scalar type, used by callers that
//! pre-size buffers before appending.

use crate::{
    error::at_least,
    primitives::get_be,
    tag::{inline_length, Payload},
    Error,
};

/// Returns the number of bytes to consume for the value starting at `b[0]` (its header and, for
/// scalars, its payload) and the number of sub-elements that follow.
///
/// For a map of N pairs the sub-element count is `2N`; for an array of N elements it is `N`. For
/// all other types it is `0`.
///
/// Only the header is inspected, so `b` needs to hold no more than the header (at most 6 bytes).
pub fn size_of(b: &[u8]) -> Result<(usize, usize), Error> {
    at_least(b, 1)?;
    let layout = inline_length(b[0]).ok_or(Error::InvalidPrefix(b[0]))?;
    match layout.payload {
        Payload::Bytes(n) => Ok((layout.header + n, 0)),
        Payload::Elements(n) => Ok((layout.header, n)),
        Payload::Length { width } => {
            at_least(b, 1 + width)?;
            let n = get_be(&b[1..], width);
            Ok((to_usize(layout.header as u64 + n)?, 0))
        }
        Payload::Count { width, per } => {
            at_least(b, 1 + width)?;
            let n = get_be(&b[1..], width);
            Ok((layout.header, to_usize(n * per as u64)?))
        }
    }
}

/// Converts a length computed from a wire count, failing if it cannot be addressed.
///
/// Counts are at most 32 bits wide, so their sums and doubles fit in a `u64`. No input that
/// fits in memory can hold a value whose length does not fit in a `usize`.
#[inline]
fn to_usize(len: u64) -> Result<usize, Error> {
    usize::try_from(len).map_err(|_| Error::ShortBytes {
        needed: usize::MAX,
        remaining: 0,
    })
}

/// Returns the number of bytes needed to read the header of the value starting with `tag`.
pub fn header_len(tag: u8) -> Result<usize, Error> {
    inline_length(tag)
        .map(|layout| layout.header)
        .ok_or(Error::InvalidPrefix(tag))
}

/// Returns the remainder of `b` after the first encoded value.
pub fn skip(b: &[u8]) -> Result<&[u8], Error> {
    let len = encoded_len(b)?;
    Ok(&b[len..])
}

/// Returns the exact encoded length of the first value in `b`, including all nested values.
///
/// Traversal is iterative: the number of values still to be consumed is tracked as a counter,
/// so deeply nested input cannot exhaust the stack.
pub fn encoded_len(b: &[u8]) -> Result<usize, Error> {
    let mut offset = 0;
    let mut pending: u64 = 1;
    while pending > 0 {
        let (bytes, elements) = size_of(&b[offset..])?;
        at_least(&b[offset..], bytes)?;
        offset += bytes;
        pending = pending - 1 + elements as u64;
    }
    Ok(offset)
}

/// Maximum encoded size of a nil.
pub const NIL_SIZE: usize = 1;
/// Maximum encoded size of a bool.
pub const BOOL_SIZE: usize = 1;
/// Maximum encoded size of an `i8` or `u8`.
pub const INT8_SIZE: usize = 2;
/// Maximum encoded size of an `i16` or `u16`.
pub const INT16_SIZE: usize = 3;
/// Maximum encoded size of an `i32` or `u32`.
pub const INT32_SIZE: usize = 5;
/// Maximum encoded size of an `i64` or `u64`.
pub const INT64_SIZE: usize = 9;
/// Maximum encoded size of any integer.
pub const INT_SIZE: usize = INT64_SIZE;
/// Encoded size of a 32-bit float.
pub const FLOAT32_SIZE: usize = 5;
/// Encoded size of a 64-bit float.
pub const FLOAT64_SIZE: usize = 9;
/// Maximum encoded size of an array header.
pub const ARRAY_HEADER_SIZE: usize = 5;
/// Maximum encoded size of a map header.
pub const MAP_HEADER_SIZE: usize = 5;
/// Maximum size of the header of a string.
pub const STR_PREFIX_SIZE: usize = 5;
/// Maximum size of the header of a binary payload.
pub const BIN_PREFIX_SIZE: usize = 5;
/// Maximum size of the header of an extension.
pub const EXT_PREFIX_SIZE: usize = 6;
/// Encoded size of a complex64.
pub const COMPLEX64_SIZE: usize = 10;
/// Encoded size of a complex128.
pub const COMPLEX128_SIZE: usize = 18;
/// Encoded size of a timestamp.
pub const TIMESTAMP_SIZE: usize = 15;

/// Exact encoded size of a string header for a string of `len` bytes.
pub const fn str_prefix_size(len: usize) -> usize {
    if len <= 31 {
        1
    } else if len <= u8::MAX as usize {
        2
    } else if len <= u16::MAX as usize {
        3
    } else {
        5
    }
}

/// Exact encoded size of a binary header for a payload of `len` bytes.
pub const fn bin_prefix_size(len: usize) -> usize {
    if len <= u8::MAX as usize {
        2
    } else if len <= u16::MAX as usize {
        3
    } else {
        5
    }
}

/// Exact encoded size of an array or map header for `len` elements or pairs.
pub const fn header_size(len: u32) -> usize {
    if len <= 15 {
        1
    } else if len <= u16::MAX as u32 {
        3
    } else {
        5
    }
}

/// Exact encoded size of an extension header for a payload of `len` bytes.
pub const fn ext_prefix_size(len: usize) -> usize {
    match len {
        1 | 2 | 4 | 8 | 16 => 2,
        _ if len <= u8::MAX as usize => 3,
        _ if len <= u16::MAX as usize => 4,
        _ => 6,
    }
}

/// Exact encoded size of an unsigned integer.
pub const fn uint_size(v: u64) -> usize {
    if v <= 0x7f {
        1
    } else if v <= u8::MAX as u64 {
        2
    } else if v <= u16::MAX as u64 {
        3
    } else if v <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Exact encoded size of a signed integer.
pub const fn int_size(v: i64) -> usize {
    if v >= 0 {
        uint_size(v as u64)
    } else if v >= -32 {
        1
    } else if v >= i8::MIN as i64 {
        2
    } else if v >= i16::MIN as i64 {
        3
    } else if v >= i32::MIN as i64 {
        5
    } else {
        9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::*;
    use test_case::test_case;

    #[test]
    fn test_size_of_scalars() {
        assert_eq!(size_of(&[0x05]).unwrap(), (1, 0));
        assert_eq!(size_of(&[0xcd, 0x01]).unwrap(), (3, 0));
        assert_eq!(size_of(&[0xa3]).unwrap(), (4, 0));
        assert_eq!(size_of(&[0xc5, 0x01, 0x00]).unwrap(), (3 + 256, 0));
        assert_eq!(size_of(&[0xc7, 0x0c]).unwrap(), (15, 0));
        assert_eq!(size_of(&[0xd8]).unwrap(), (18, 0));
    }

    #[test]
    fn test_size_of_containers() {
        assert_eq!(size_of(&[0x83]).unwrap(), (1, 6));
        assert_eq!(size_of(&[0x92]).unwrap(), (1, 2));
        assert_eq!(size_of(&[0xdc, 0x00, 0x20]).unwrap(), (3, 32));
        assert_eq!(size_of(&[0xde, 0x00, 0x20]).unwrap(), (3, 64));
    }

    #[test]
    fn test_size_of_errors() {
        assert!(matches!(size_of(&[]), Err(Error::ShortBytes { .. })));
        assert!(matches!(size_of(&[0xc1]), Err(Error::InvalidPrefix(0xc1))));
        assert!(matches!(size_of(&[0xda, 0x01]), Err(Error::ShortBytes { .. })));
    }

    #[test_case(&[0xdf, 0xff, 0xff, 0xff, 0xff]; "map32 with maximum count")]
    #[test_case(&[0xdd, 0xff, 0xff, 0xff, 0xff]; "array32 with maximum count")]
    #[test_case(&[0xdb, 0xff, 0xff, 0xff, 0xff]; "str32 with maximum length")]
    #[test_case(&[0xc6, 0xff, 0xff, 0xff, 0xff]; "bin32 with maximum length")]
    #[test_case(&[0xc9, 0xff, 0xff, 0xff, 0xff, 0x01]; "ext32 with maximum length")]
    fn test_maximum_lengths(b: &[u8]) {
        // Whether or not the length is addressable, the input is reported as truncated
        assert!(encoded_len(b).unwrap_err().is_short());
        assert!(skip(b).unwrap_err().is_short());
        if let Ok((bytes, elements)) = size_of(b) {
            assert!(bytes as u64 + elements as u64 >= u32::MAX as u64);
        }
    }

    #[test]
    fn test_encoded_len_nested() {
        // {"a": [1, {"b": nil}], "c": "xyz"}
        let mut buf = Vec::new();
        put_map_header(&mut buf, 2);
        put_str(&mut buf, "a");
        put_array_header(&mut buf, 2);
        put_uint(&mut buf, 1);
        put_map_header(&mut buf, 1);
        put_str(&mut buf, "b");
        put_nil(&mut buf);
        put_str(&mut buf, "c");
        put_str(&mut buf, "xyz");
        let len = buf.len();
        buf.extend_from_slice(&[0xc3, 0xc2]);

        assert_eq!(encoded_len(&buf).unwrap(), len);
        assert_eq!(skip(&buf).unwrap(), &[0xc3, 0xc2]);
        assert!(matches!(
            encoded_len(&buf[..len - 1]),
            Err(Error::ShortBytes { .. })
        ));
    }

    #[test]
    fn test_deep_nesting_is_iterative() {
        let depth = 100_000;
        let mut buf = vec![0x91; depth];
        buf.push(0xc0);
        assert_eq!(encoded_len(&buf).unwrap(), depth + 1);
    }

    #[test]
    fn test_size_estimates_match_encoding() {
        for v in [0i64, 127, 128, -1, -32, -33, -200, 70000, -70000, i64::MIN, i64::MAX] {
            let mut buf = Vec::new();
            put_int(&mut buf, v);
            assert_eq!(buf.len(), int_size(v), "value {v}");
            assert!(buf.len() <= INT_SIZE);
        }
        for len in [0usize, 31, 32, 255, 256, 65535, 65536] {
            let mut buf = Vec::new();
            put_str_header(&mut buf, len);
            assert_eq!(buf.len(), str_prefix_size(len));
            buf.clear();
            put_bin_header(&mut buf, len);
            assert_eq!(buf.len(), bin_prefix_size(len));
            buf.clear();
            put_ext_header(&mut buf, 1, len);
            assert_eq!(buf.len(), ext_prefix_size(len));
        }
        assert_eq!(header_size(15), 1);
        assert_eq!(header_size(16), 3);
        assert_eq!(header_size(65536), 5);
    }
}
